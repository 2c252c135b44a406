//! Asynchronous driver around [`DraftSession`].
//!
//! Each generation runs in its own tokio task: draw, reveal, settle, then the form
//! and power-up lookups. The task reports back on an mpsc channel tagged with its
//! token; reports from superseded generations are dropped. Player commands go through
//! the session and automatically start the next generation when one is due.

use crate::draft::generator::CandidateGenerator;
use crate::draft::resolution::FormResolver;
use crate::draft::reveal::{RevealSequencer, SettleOutcome};
use crate::draft::session::{
    Assignment, DraftSession, FormStep, GenerationTicket, MegaStep, Next, Phase, SkipOutcome,
};
use crate::draft::sink::EventSink;
use crate::draft::token::GenerationHandle;
use crate::draft::types::{DraftError, PresentationEvent, Rejection, StaleGeneration};
use crate::types::{Candidate, StatKey};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Result of one generation task.
#[derive(Debug)]
pub enum GenerationOutcome {
    Resolved {
        candidate: Candidate,
        forms: Vec<Candidate>,
        /// Power-ups of the base candidate; only looked up when there is no form choice
        megas: Vec<Candidate>,
    },
    AssetFailed,
    Failed(DraftError),
}

#[derive(Debug)]
pub struct GenerationReport {
    pub token: u64,
    pub outcome: GenerationOutcome,
}

/// Shared collaborators of every generation task.
struct Workers {
    generator: CandidateGenerator,
    resolver: FormResolver,
    sequencer: RevealSequencer,
}

/// Runs a [`DraftSession`] against real (or in-memory) collaborators.
pub struct DraftEngine {
    session: DraftSession,
    workers: Arc<Workers>,
    sink: EventSink,
    reports_tx: mpsc::UnboundedSender<GenerationReport>,
    reports_rx: mpsc::UnboundedReceiver<GenerationReport>,
    active: Option<GenerationHandle>,
    skip_pause: Duration,
}

impl DraftEngine {
    pub fn new(
        session: DraftSession,
        generator: CandidateGenerator,
        resolver: FormResolver,
        sequencer: RevealSequencer,
        sink: EventSink,
        skip_pause: Duration,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            session,
            workers: Arc::new(Workers {
                generator,
                resolver,
                sequencer,
            }),
            sink,
            reports_tx,
            reports_rx,
            active: None,
            skip_pause,
        }
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    /// Start a new generation, superseding any generation in flight.
    pub fn start_generation(&mut self) -> Result<u64, Rejection> {
        let ticket = self.session.begin_generation()?;
        let token = ticket.handle.token();
        self.active = Some(ticket.handle.clone());

        let workers = self.workers.clone();
        let sink = self.sink.clone();
        let reports = self.reports_tx.clone();
        tokio::spawn(async move {
            let outcome = run_generation(&workers, &sink, ticket).await;
            if reports.send(GenerationReport { token, outcome }).is_err() {
                debug!("Engine gone, dropping report of generation {}", token);
            }
        });

        Ok(token)
    }

    /// Wait until the current generation has produced a candidate that needs player
    /// input. Asset failures restart the generation; stale reports are ignored.
    /// Returns immediately when no generation is in flight.
    #[instrument(skip(self))]
    pub async fn wait_ready(&mut self) -> Result<(), DraftError> {
        loop {
            if !matches!(self.session.phase(), Phase::Generating { .. }) {
                return Ok(());
            }
            let report = self
                .reports_rx
                .recv()
                .await
                .ok_or(DraftError::Cancelled)?;

            if report.token != self.session.current_token() {
                debug!("Dropping report of superseded generation {}", report.token);
                continue;
            }

            match report.outcome {
                GenerationOutcome::Resolved {
                    candidate,
                    forms,
                    megas,
                } => {
                    if self.apply_resolved(report.token, candidate, forms, megas).is_ok() {
                        return Ok(());
                    }
                    warn!("Generation {} no longer matches the session, restarting", report.token);
                    self.start_generation()?;
                }
                GenerationOutcome::AssetFailed => {
                    info!("Restarting generation after a sprite failure");
                    self.start_generation()?;
                }
                GenerationOutcome::Failed(DraftError::Cancelled) => continue,
                GenerationOutcome::Failed(e) => return Err(e),
            }
        }
    }

    fn apply_resolved(
        &mut self,
        token: u64,
        candidate: Candidate,
        forms: Vec<Candidate>,
        megas: Vec<Candidate>,
    ) -> Result<(), StaleGeneration> {
        self.session.complete_generation(token, candidate)?;
        match self.session.resolve_forms(token, forms)? {
            FormStep::Choose(options) => {
                self.sink.publish(PresentationEvent::FormChoice { options });
            }
            FormStep::Single => self.offer_megas(token, megas)?,
        }
        Ok(())
    }

    fn offer_megas(
        &mut self,
        token: u64,
        megas: Vec<Candidate>,
    ) -> Result<(), StaleGeneration> {
        let options: Vec<String> = megas.iter().map(|mega| mega.name.clone()).collect();
        if self.session.offer_megas(token, megas)? {
            self.sink.publish(PresentationEvent::MegaAvailable { options });
        }
        Ok(())
    }

    /// Start the first generation and wait for it.
    pub async fn start(&mut self) -> Result<(), DraftError> {
        self.start_generation()?;
        self.wait_ready().await
    }

    /// Assign the displayed candidate; starts the next generation unless the draft is
    /// complete. Does not wait for it.
    pub async fn assign(&mut self, stat: StatKey) -> Result<Assignment, DraftError> {
        let assignment = self.session.assign(stat)?;
        self.sink.publish(PresentationEvent::Assigned {
            stat,
            name: assignment.name.clone(),
            value: assignment.value,
            bonus: assignment.bonus,
        });

        match &assignment.next {
            Next::Complete(scorecard) => {
                self.sink.publish(PresentationEvent::Completed {
                    scorecard: scorecard.clone(),
                });
            }
            Next::Generate => {
                self.start_generation()?;
            }
        }
        Ok(assignment)
    }

    /// Skip the displayed candidate, pause, then start the next generation.
    pub async fn skip(&mut self) -> Result<SkipOutcome, DraftError> {
        let outcome = self.session.skip()?;
        self.sink.publish(PresentationEvent::Skipped {
            skips_left: outcome.skips_left,
        });

        if !self.skip_pause.is_zero() {
            tokio::time::sleep(self.skip_pause).await;
        }
        self.start_generation()?;
        Ok(outcome)
    }

    pub fn mega_evolve(&mut self) -> Result<MegaStep, Rejection> {
        let step = self.session.mega_evolve()?;
        match &step {
            MegaStep::Applied(candidate) => self.sink.publish(PresentationEvent::CandidateChanged {
                candidate: candidate.clone(),
            }),
            MegaStep::Choose(options) => self.sink.publish(PresentationEvent::MegaChoice {
                options: options.clone(),
            }),
        }
        Ok(step)
    }

    pub fn choose_mega(&mut self, index: usize) -> Result<Candidate, Rejection> {
        let candidate = self.session.choose_mega(index)?;
        self.sink.publish(PresentationEvent::CandidateChanged {
            candidate: candidate.clone(),
        });
        Ok(candidate)
    }

    /// Pick a form, then look up power-ups for it.
    pub async fn choose_form(&mut self, index: usize) -> Result<Candidate, DraftError> {
        let chosen = self.session.choose_form(index)?;
        self.sink.publish(PresentationEvent::CandidateChanged {
            candidate: chosen.clone(),
        });

        let handle = self.active.clone().ok_or(DraftError::Cancelled)?;
        let megas = self.workers.resolver.megas_for(&chosen, &handle).await?;
        self.offer_megas(handle.token(), megas)
            .map_err(|_| DraftError::Cancelled)?;
        Ok(chosen)
    }
}

async fn run_generation(workers: &Workers, sink: &EventSink, ticket: GenerationTicket) -> GenerationOutcome {
    let GenerationTicket { handle, gate, seed } = ticket;
    let mut rng = StdRng::seed_from_u64(seed);

    let drawn = workers
        .sequencer
        .spin(&handle, sink, workers.generator.generate(&gate, &handle, &mut rng, sink))
        .await;
    let candidate = match drawn {
        Ok(candidate) => candidate,
        Err(e) => return GenerationOutcome::Failed(e),
    };

    match workers.sequencer.settle(&handle, sink, &candidate).await {
        Ok(SettleOutcome::Shown) => {}
        Ok(SettleOutcome::AssetFailed) => return GenerationOutcome::AssetFailed,
        Err(e) => return GenerationOutcome::Failed(e),
    }

    let forms = match workers.resolver.forms_for(&candidate, &handle).await {
        Ok(forms) => forms,
        Err(e) => return GenerationOutcome::Failed(e),
    };
    let megas = if forms.len() > 1 {
        Vec::new()
    } else {
        match workers.resolver.megas_for(&candidate, &handle).await {
            Ok(megas) => megas,
            Err(e) => return GenerationOutcome::Failed(e),
        }
    };

    GenerationOutcome::Resolved {
        candidate,
        forms,
        megas,
    }
}
