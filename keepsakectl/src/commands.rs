use std::sync::Arc;

use anyhow::{Context, Result, bail};
use keepsake_config::units::parse_byte_size;
use keepsake_contracts::{
    LibraryError, MemoryCacheStore, RemoteLibrary, SettingsStore,
};
use keepsake_core::{
    infra::{
        connectivity::{ConnectivitySignal, probe_once},
        remote::HttpRemoteLibrary,
    },
    memories::{MemoryOrchestrator, MemoryOrigin, MemoryState},
};
use keepsake_model::{
    MediaId, MediaItem, Memory, MemoryCount, MemorySource, OwnerId,
    RefetchSettingsPatch,
};
use tracing::debug;

use crate::{MemoriesArgs, SettingsSetArgs, session::Session};

/// Stand-in library for sessions without a configured remote.
#[derive(Debug)]
struct Unconfigured;

#[async_trait::async_trait]
impl RemoteLibrary for Unconfigured {
    async fn list_media(
        &self,
        _owner: &OwnerId,
    ) -> Result<Vec<MediaItem>, LibraryError> {
        Err(LibraryError::Connectivity(
            "no remote library configured".into(),
        ))
    }

    async fn fetch_reference(
        &self,
        item: &MediaItem,
        _reference: &str,
    ) -> Result<Vec<u8>, LibraryError> {
        Err(LibraryError::Resolution {
            id: item.id.clone(),
            reason: "no remote library configured".into(),
        })
    }
}

pub(crate) async fn memories(
    session: &Session,
    args: MemoriesArgs,
) -> Result<()> {
    let remote = &session.config.remote;

    let (library, online): (Arc<dyn RemoteLibrary>, bool) = match &remote.url {
        Some(url) if !args.offline => {
            let library =
                HttpRemoteLibrary::new(url.clone(), remote.request_timeout)?;
            let online = probe_once(library.client(), url).await;
            (Arc::new(library), online)
        }
        _ => (Arc::new(Unconfigured), false),
    };
    debug!(online, "connectivity determined");

    let connectivity = ConnectivitySignal::new(online);
    let orchestrator = MemoryOrchestrator::builder(
        library,
        session.cache.clone(),
        session.settings.clone(),
    )
    .owner(session.owner.clone())
    .connectivity(connectivity.watch())
    .build();

    let outcome = orchestrator.refetch_now(args.force).await;
    let state = outcome.state.clone();

    match &state {
        MemoryState::Ready(set) => {
            if let Some(advisory) = set.advisory {
                println!("{advisory}");
            }
            let origin = match set.origin {
                MemoryOrigin::Fresh => "new selection",
                MemoryOrigin::Cache => "from cache",
            };
            println!("{} memories ({origin})", set.len());
            for memory in &set.memories {
                println!("{}", describe(memory));
            }
        }
        MemoryState::Failed(failed) => {
            println!("{}", failed.advisory());
            bail!(failed.error.clone());
        }
        MemoryState::Idle | MemoryState::Loading => {
            println!("No memories to show.");
        }
    }

    if let Some(report) = outcome.write_through_report().await {
        if report.is_committed() {
            println!(
                "Cached {} of {} memories for offline viewing.",
                report.cached.len(),
                report.attempted
            );
        } else if let Some(err) = &report.error {
            println!("Memories could not be cached: {err}");
        }
    }
    Ok(())
}

fn describe(memory: &Memory) -> String {
    let source = match &memory.source {
        MemorySource::Cached(_) => "cached",
        MemorySource::Inline(_) => "inline",
        MemorySource::Remote(_) => "remote",
    };
    format!(
        "  {:<24} {:<32} {:<12} {} [{source}]",
        memory.id.as_str(),
        memory.file_name,
        memory.mime_type,
        memory.uploaded_at.format("%Y-%m-%d"),
    )
}

pub(crate) async fn cache_info(session: &Session) -> Result<()> {
    let info = session.cache.info().await.context("reading memory cache")?;
    println!("location: {}", session.cache.index_path().display());
    println!("memories: {}", info.item_count);
    println!("size:     {}", info.bytes);
    Ok(())
}

pub(crate) async fn cache_clear(session: &Session) -> Result<()> {
    session.cache.clear().await.context("clearing memory cache")?;
    println!("Memory cache cleared.");
    Ok(())
}

pub(crate) async fn cache_remove(session: &Session, id: MediaId) -> Result<()> {
    session.cache.remove(&id).await.context("removing cached memory")?;
    println!("Removed {id} from the memory cache.");
    Ok(())
}

pub(crate) async fn settings_show(session: &Session) -> Result<()> {
    let settings = session.settings.read().await?;
    println!("frequency:    {}", settings.frequency);
    println!("memory count: {}", settings.memory_count);
    println!("cache budget: {}", settings.cache_budget);
    match settings.last_refetch_time {
        Some(at) => println!("last refetch: {}", at.to_rfc3339()),
        None => println!("last refetch: never"),
    }
    Ok(())
}

pub(crate) async fn settings_set(
    session: &Session,
    args: SettingsSetArgs,
) -> Result<()> {
    let patch = RefetchSettingsPatch {
        frequency: args.frequency,
        memory_count: args.count.map(MemoryCount::new),
        cache_budget: args
            .budget
            .as_deref()
            .map(parse_byte_size)
            .transpose()
            .map_err(anyhow::Error::msg)?,
        last_refetch_time: args.reset_schedule.then_some(None),
    };
    if patch.is_empty() {
        bail!(
            "nothing to change; \
             pass --frequency, --count, --budget or --reset-schedule"
        );
    }

    session.settings.write(patch).await?;
    settings_show(session).await
}
