//! The dual-destination card ingest.

use super::types::{CopyReport, IngestRequest, IngestResult, SpaceReport};
use crate::core::copier::{CopierKind, CopyExit, CopyJob, CopyOptions, CopyRunner};
use crate::core::layout::{normalize_root, CardLayout, Destination, DestinationPaths};
use crate::core::space::{required_with_margin, SpaceQuery, SysinfoSpaceQuery};
use crate::error::{CopyError, IngestError, Result, SpaceError};
use crate::events::{null_sender, Event, EventSender, IngestEvent};
use std::path::Path;
use std::thread;

/// Builder for the ingest operation
pub struct CardIngestBuilder {
    space: Option<Box<dyn SpaceQuery>>,
    copier: Option<Box<dyn CopyRunner>>,
    options: CopyOptions,
}

impl CardIngestBuilder {
    pub fn new() -> Self {
        Self {
            space: None,
            copier: None,
            options: CopyOptions::default(),
        }
    }

    /// Set the space query backend
    pub fn space_query(mut self, space: Box<dyn SpaceQuery>) -> Self {
        self.space = Some(space);
        self
    }

    /// Set the copy backend
    pub fn copier(mut self, copier: Box<dyn CopyRunner>) -> Self {
        self.copier = Some(copier);
        self
    }

    /// Set retry/thread tuning passed to both copies
    pub fn copy_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the operation, filling in OS-backed defaults
    pub fn build(self) -> CardIngest {
        CardIngest {
            space: self.space.unwrap_or_else(|| Box::new(SysinfoSpaceQuery::new())),
            copier: self
                .copier
                .unwrap_or_else(|| CopierKind::platform_default().build()),
            options: self.options,
        }
    }
}

impl Default for CardIngestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies one card to the archive and proxy drives at the same time
pub struct CardIngest {
    space: Box<dyn SpaceQuery>,
    copier: Box<dyn CopyRunner>,
    options: CopyOptions,
}

impl CardIngest {
    pub fn builder() -> CardIngestBuilder {
        CardIngestBuilder::new()
    }

    /// Run one card without events
    pub fn ingest(&self, request: &IngestRequest) -> Result<IngestResult> {
        self.ingest_with_events(request, &null_sender())
    }

    /// Run one card, reporting progress on `events`.
    ///
    /// Space shortfalls and failed copies come back as `Ok` results. `Err`
    /// is reserved for things that stopped the operation itself, such as a
    /// folder that cannot be created or a volume that vanished.
    pub fn ingest_with_events(
        &self,
        request: &IngestRequest,
        events: &EventSender,
    ) -> Result<IngestResult> {
        let source_root = normalize_root(&request.source_root);
        let archive_root = normalize_root(&request.archive_root);
        let proxy_root = normalize_root(&request.proxy_root);

        tracing::info!(
            card = request.card_index,
            source = %source_root.display(),
            archive = %archive_root.display(),
            proxy = %proxy_root.display(),
            "starting card ingest"
        );
        events.send(Event::Ingest(IngestEvent::Started {
            card_index: request.card_index,
            source: source_root.clone(),
        }));

        let layout = CardLayout::new(
            &archive_root,
            &proxy_root,
            &request.base_folder_name,
            &request.client_project,
            &request.ingest_date,
            request.card_index,
        )?;
        tracing::debug!(
            archive_dir = %layout.archive.card_dir.display(),
            proxy_dir = %layout.proxy.card_dir.display(),
            "derived card layout"
        );
        layout.ensure()?;

        let space = self.check_space(&source_root, &archive_root, &proxy_root)?;
        events.send(Event::Ingest(IngestEvent::SpaceChecked(space)));

        if !space.fits_both() {
            let result = IngestResult::not_enough_space(space);
            tracing::warn!(card = request.card_index, "{}", result.message);
            return Ok(result);
        }

        let (archive, proxy) = self.copy_both(&source_root, &layout, events)?;
        let result = IngestResult::from_copies(space, archive, proxy);

        if result.ok {
            tracing::info!(card = request.card_index, "{}", result.message);
        } else {
            tracing::warn!(card = request.card_index, "{}", result.message);
        }
        Ok(result)
    }

    /// Pre-flight space figures for a card against both destinations.
    ///
    /// Front-ends call this before enabling the copy, the ingest calls it
    /// again right before copying.
    pub fn check_space(
        &self,
        source_root: &Path,
        archive_root: &Path,
        proxy_root: &Path,
    ) -> std::result::Result<SpaceReport, SpaceError> {
        let source_used_bytes = self.space.space(source_root)?.used_bytes();
        let required_bytes = required_with_margin(source_used_bytes);

        let archive_free_bytes = self.space.space(archive_root)?.free_bytes;
        let proxy_free_bytes = self.space.space(proxy_root)?.free_bytes;

        Ok(SpaceReport {
            source_used_bytes,
            required_bytes,
            archive_free_bytes,
            proxy_free_bytes,
        })
    }

    /// Launch both copies, then join both before looking at either
    fn copy_both(
        &self,
        source_root: &Path,
        layout: &CardLayout,
        events: &EventSender,
    ) -> Result<(CopyReport, CopyReport)> {
        let archive_job = self.copy_job(source_root, &layout.archive);
        let proxy_job = self.copy_job(source_root, &layout.proxy);

        let (archive_joined, proxy_joined) = thread::scope(|scope| {
            let archive = scope.spawn(|| self.run_copy(Destination::Archive, &archive_job, events));
            let proxy = scope.spawn(|| self.run_copy(Destination::Proxy, &proxy_job, events));
            (archive.join(), proxy.join())
        });

        let archive_exit = joined_exit(Destination::Archive, archive_joined);
        let proxy_exit = joined_exit(Destination::Proxy, proxy_joined);

        match (archive_exit, proxy_exit) {
            (Ok(archive), Ok(proxy)) => Ok((
                CopyReport {
                    exit_code: archive,
                    log_path: layout.archive.log_file.clone(),
                },
                CopyReport {
                    exit_code: proxy,
                    log_path: layout.proxy.log_file.clone(),
                },
            )),
            (Err(e), other) | (other, Err(e)) => {
                if let Err(second) = other {
                    tracing::error!(error = %second, "both copies failed to run");
                }
                Err(IngestError::Copy(e))
            }
        }
    }

    fn copy_job(&self, source_root: &Path, paths: &DestinationPaths) -> CopyJob {
        CopyJob {
            source: source_root.to_path_buf(),
            destination: paths.card_dir.clone(),
            log_path: paths.log_file.clone(),
            options: self.options.clone(),
        }
    }

    fn run_copy(
        &self,
        destination: Destination,
        job: &CopyJob,
        events: &EventSender,
    ) -> std::result::Result<CopyExit, CopyError> {
        events.send(Event::Ingest(IngestEvent::CopyStarted {
            destination,
            target: job.destination.clone(),
            log_path: job.log_path.clone(),
        }));

        let outcome = self.copier.run(job);

        match &outcome {
            Ok(exit) => tracing::info!(%destination, exit_code = exit.code(), "copy finished"),
            Err(e) => tracing::error!(%destination, error = %e, "copy could not run"),
        }
        events.send(Event::Ingest(IngestEvent::CopyFinished {
            destination,
            exit_code: outcome.as_ref().ok().copied(),
        }));

        outcome
    }
}

fn joined_exit(
    destination: Destination,
    joined: thread::Result<std::result::Result<CopyExit, CopyError>>,
) -> std::result::Result<CopyExit, CopyError> {
    joined.unwrap_or_else(|_| {
        Err(CopyError::ThreadPanicked {
            destination: destination.to_string(),
        })
    })
}
