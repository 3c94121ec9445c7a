//! Parsing of human-friendly byte sizes.

use keepsake_model::ByteSize;

/// Parse `"512"`, `"64KiB"`, `"100 MiB"`, `"1.5GB"` and similar.
///
/// Binary suffixes (`KiB`, `MiB`, `GiB`) and bare `K`/`M`/`G` are powers of
/// 1024; `KB`/`MB`/`GB` are powers of 1000.
pub fn parse_byte_size(input: &str) -> Result<ByteSize, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| format!("'{input}' is not a byte size"))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => 1 << 10,
        "m" | "mib" => 1 << 20,
        "g" | "gib" => 1 << 30,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        other => return Err(format!("unknown byte size unit '{other}'")),
    };

    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(format!("'{input}' is out of range"));
    }
    Ok(ByteSize::from_bytes(bytes.round() as u64))
}
