//! Interactive training session.
//!
//! Reads commands from stdin and drives the lifecycle controller through plan
//! review, warm-up, the exercise loop and completion. Ctrl-C or end of input
//! saves a resumable snapshot before exiting.

use anyhow::{Context, Result, anyhow};
use hometrain_application::{
    AbandonmentMonitor, EnvironmentSignal, ExerciseResult, LifecycleState, RejectionCycle,
    RejectionDraft, SessionLifecycleController, TrainingServices, WarmupCommand, WarmupDriver,
};
use hometrain_core::HomeTrainError;
use hometrain_core::plan::{ExerciseTarget, PlanConstraints};
use hometrain_core::progress::{ExerciseFeedback, FeedbackSentiment};
use hometrain_core::rejection::RejectionCategory;
use hometrain_core::session::AbandonReason;
use hometrain_core::warmup::{
    FitnessLevel, WarmupSequencer, WarmupSignal, WarmupStep, WarmupSummary,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

type Input = Lines<BufReader<Stdin>>;

pub struct SessionOptions {
    pub constraints: PlanConstraints,
    pub skip_warmup: bool,
    pub level: FitnessLevel,
    pub auto_continue_warmup: bool,
    pub snapshot_timeout: Duration,
}

/// One line typed during the exercise loop.
#[derive(Debug, Clone, PartialEq)]
enum SessionInput {
    Finish(ExerciseResult, Option<u32>),
    Series(u32),
    Feedback(ExerciseFeedback),
    Reject,
    Regenerate,
    Background,
    Foreground,
    Quit,
    Help,
}

impl SessionInput {
    fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?.to_lowercase();
        let number = |word: Option<&str>| word.and_then(|w| w.parse::<u32>().ok());

        let input = match command.as_str() {
            "c" | "done" => Self::Finish(ExerciseResult::Completed, number(words.next())),
            "s" | "skip" => Self::Finish(ExerciseResult::Skipped, None),
            "x" | "cancel" => Self::Finish(ExerciseResult::Cancelled, number(words.next())),
            "p" | "series" => Self::Series(number(words.next())?),
            "f" | "feedback" => {
                let sentiment = words.next()?.parse::<FeedbackSentiment>().ok()?;
                let comment = words.collect::<Vec<_>>().join(" ");
                Self::Feedback(ExerciseFeedback {
                    sentiment,
                    comment: (!comment.is_empty()).then_some(comment),
                })
            }
            "r" | "reject" => Self::Reject,
            "g" | "regenerate" => Self::Regenerate,
            "bg" | "pause" => Self::Background,
            "fg" | "resume" => Self::Foreground,
            "q" | "quit" => Self::Quit,
            "?" | "h" | "help" => Self::Help,
            _ => return None,
        };
        Some(input)
    }
}

struct Session<'a> {
    controller: SessionLifecycleController,
    cycle: RejectionCycle,
    options: &'a SessionOptions,
    input: Input,
    input_open: bool,
    signals: mpsc::Sender<EnvironmentSignal>,
    reconcile: mpsc::Receiver<String>,
}

pub async fn run(services: TrainingServices, options: SessionOptions) -> Result<()> {
    let controller = SessionLifecycleController::new(services.clone());
    let monitor = Arc::new(AbandonmentMonitor::new(
        services.sessions.clone(),
        controller.ledger(),
        controller.update_client().flights(),
        options.snapshot_timeout,
    ));

    let (signal_tx, signal_rx) = mpsc::channel(8);
    let (reconcile_tx, reconcile_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let monitor_task = Arc::clone(&monitor).spawn(signal_rx, reconcile_tx, cancel.clone());

    let mut session = Session {
        controller,
        cycle: RejectionCycle::new(services.rejections),
        options: &options,
        input: BufReader::new(tokio::io::stdin()).lines(),
        input_open: true,
        signals: signal_tx,
        reconcile: reconcile_rx,
    };
    let result = session.drive().await;

    cancel.cancel();
    if let Err(err) = monitor_task.await {
        tracing::warn!("[CLI] Abandonment monitor ended abnormally: {}", err);
    }
    if !monitor.flush(options.snapshot_timeout).await {
        println!("Saving progress timed out.");
    }
    result
}

impl Session<'_> {
    async fn drive(&mut self) -> Result<()> {
        match self.controller.restore().await {
            Ok(LifecycleState::Exercising) => println!(
                "Resuming your session at exercise {}.",
                self.controller.current_index() + 1
            ),
            Ok(state) if state.is_terminal() => self.controller.reset().await?,
            Ok(_) => {}
            Err(err) => {
                fatal_if_auth(&err)?;
                tracing::warn!("[CLI] Could not restore previous plan: {}", err);
            }
        }

        loop {
            match self.controller.state() {
                LifecycleState::Idle | LifecycleState::Abandoned => {
                    let constraints = self.options.constraints;
                    println!(
                        "Generating a {} / {} plan...",
                        constraints.equipment, constraints.training_type
                    );
                    self.cycle
                        .request_plan(&mut self.controller, self.options.constraints)
                        .await
                        .context("Plan generation failed")?;
                }
                LifecycleState::PlanReady => {
                    if !self.review_plan().await? {
                        return Ok(());
                    }
                }
                LifecycleState::Exercising => {
                    if !self.exercise_step().await? {
                        return Ok(());
                    }
                }
                LifecycleState::Completed => {
                    self.print_summary().await;
                    return Ok(());
                }
                state @ (LifecycleState::PlanPending | LifecycleState::Warmup) => {
                    return Err(anyhow!("session stopped in unexpected state {state}"));
                }
            }
        }
    }

    // ============================================================================
    // Plan review
    // ============================================================================

    async fn review_plan(&mut self) -> Result<bool> {
        self.print_plan();
        let Some(answer) =
            self.prompt("[a]ccept, [r]eject exercises, [n]ew plan, [q]uit > ").await?
        else {
            return Ok(false);
        };

        match answer.to_lowercase().as_str() {
            "" | "a" | "accept" => {
                let warmup = self
                    .controller
                    .accept_plan(self.options.skip_warmup, self.options.level)
                    .await?;
                if let Some(sequencer) = warmup {
                    let summary = self.run_warmup(sequencer).await?;
                    self.controller.complete_warmup(summary)?;
                }
                println!("Let's go. Type `?` for commands.");
            }
            "r" | "reject" => self.reject_from_plan().await?,
            "n" | "new" => self.regenerate().await?,
            "q" | "quit" => return Ok(false),
            other => println!("Unknown choice '{other}'."),
        }
        Ok(true)
    }

    async fn reject_from_plan(&mut self) -> Result<()> {
        let Some(numbers) = self.prompt("Exercise numbers to reject (e.g. 1,3): ").await? else {
            return Ok(());
        };
        let names: Vec<String> = numbers
            .split(',')
            .filter_map(|n| n.trim().parse::<usize>().ok())
            .filter_map(|n| n.checked_sub(1))
            .filter_map(|i| self.controller.exercises().get(i).map(|e| e.name.clone()))
            .collect();
        if names.is_empty() {
            return Ok(());
        }
        self.submit_rejections(names).await
    }

    async fn submit_rejections(&mut self, names: Vec<String>) -> Result<()> {
        let Some(draft) = self.draft_template().await? else {
            return Ok(());
        };
        let drafts = names
            .into_iter()
            .map(|name| RejectionDraft {
                exercise_name: name,
                ..draft.clone()
            })
            .collect();

        match self.cycle.submit_rejections(&mut self.controller, drafts).await {
            Ok((rules, _)) => println!("{} exercise(s) excluded. Here is a new plan.", rules.len()),
            Err(err) => {
                fatal_if_auth(&err)?;
                println!("Could not save the rejection: {err}");
            }
        }
        Ok(())
    }

    async fn regenerate(&mut self) -> Result<()> {
        println!("Generating a new plan...");
        if let Err(err) = self.cycle.skip_rejection(&mut self.controller).await {
            fatal_if_auth(&err)?;
            println!("Could not generate a new plan: {err}");
        }
        Ok(())
    }

    /// Category, reason and expiry shared by every rejected exercise.
    async fn draft_template(&mut self) -> Result<Option<RejectionDraft>> {
        let Some(category) = self
            .prompt("Why? [too_hard/dont_like/injury/equipment/other] (dont_like): ")
            .await?
        else {
            return Ok(None);
        };
        let category = category.parse::<RejectionCategory>().unwrap_or_default();
        let reason = self.prompt("Comment (optional): ").await?.unwrap_or_default();
        let days = self
            .prompt("Exclude for how many days? (blank = always): ")
            .await?
            .and_then(|d| d.parse::<u32>().ok());

        let mut draft = RejectionDraft::new(String::new(), category);
        if !reason.is_empty() {
            draft = draft.with_reason(reason);
        }
        if let Some(days) = days {
            draft = draft.expiring_in_days(days);
        }
        Ok(Some(draft))
    }

    // ============================================================================
    // Warm-up
    // ============================================================================

    async fn run_warmup(&mut self, sequencer: WarmupSequencer) -> Result<WarmupSummary> {
        let steps: Vec<WarmupStep> = sequencer.steps().to_vec();
        println!("Warm-up ({} steps). Commands: start, pause, advance, skip, reset", steps.len());
        if let Some(first) = steps.first() {
            println!("  1. {} ({}s): {}", first.name, first.duration_seconds, first.description);
        }

        let (command_tx, command_rx) = mpsc::channel(8);
        let (signal_tx, mut signal_rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let driver = WarmupDriver::new(sequencer, self.options.auto_continue_warmup);
        let mut handle = tokio::spawn(driver.run(command_rx, signal_tx, cancel.clone()));

        loop {
            tokio::select! {
                summary = &mut handle => return summary.context("Warm-up task failed"),
                Some(signal) = signal_rx.recv() => print_warmup_signal(&steps, signal),
                line = self.input.next_line(), if self.input_open => match line? {
                    Some(text) => match text.trim().parse::<WarmupCommand>() {
                        Ok(command) => {
                            if command_tx.send(command).await.is_err() {
                                tracing::debug!("[CLI] Warm-up already finished");
                            }
                        }
                        Err(_) => println!("Commands: start, pause, advance, skip, reset"),
                    },
                    None => {
                        self.input_open = false;
                        cancel.cancel();
                    }
                },
            }
        }
    }

    // ============================================================================
    // Exercise loop
    // ============================================================================

    async fn exercise_step(&mut self) -> Result<bool> {
        self.print_current().await;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                self.unload().await;
                return Ok(false);
            }
            Some(session_id) = self.reconcile.recv() => {
                if let Err(err) = self.controller.resume(&session_id).await {
                    fatal_if_auth(&err)?;
                    println!("Could not refresh the session: {err}");
                }
                return Ok(true);
            }
            line = self.input.next_line(), if self.input_open => line?,
        };
        let Some(line) = line else {
            self.input_open = false;
            self.unload().await;
            return Ok(false);
        };

        let Some(input) = SessionInput::parse(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command. Type `?` for help.");
            }
            return Ok(true);
        };

        let outcome = match input {
            SessionInput::Finish(result, seconds) => self
                .controller
                .advance(result, seconds)
                .await
                .map(|_| ()),
            SessionInput::Series(series) => self
                .controller
                .record_series(series, None)
                .await
                .map(|r| {
                    println!(
                        "  {}/{} series ({})",
                        r.progress.series_completed, r.progress.total_series, r.progress.status
                    )
                }),
            SessionInput::Feedback(feedback) => {
                let index = self.controller.current_index();
                self.controller.submit_feedback(index, feedback).await
            }
            SessionInput::Reject => {
                let name = self.controller.current_exercise().map(|e| e.name.clone());
                if let Some(name) = name {
                    self.submit_rejections(vec![name]).await?;
                }
                Ok(())
            }
            SessionInput::Regenerate => {
                self.regenerate().await?;
                Ok(())
            }
            SessionInput::Background => {
                self.send_signal(EnvironmentSignal::Backgrounded).await;
                println!("Paused. Type `fg` to continue.");
                Ok(())
            }
            SessionInput::Foreground => {
                self.send_signal(EnvironmentSignal::Foregrounded).await;
                Ok(())
            }
            SessionInput::Quit => {
                self.leave(AbandonReason::UserCancelled).await;
                return Ok(false);
            }
            SessionInput::Help => {
                print_help();
                Ok(())
            }
        };

        if let Err(err) = outcome {
            fatal_if_auth(&err)?;
            println!("{err}");
        }
        Ok(true)
    }

    /// Saves a snapshot of the session, bounded by the snapshot timeout.
    async fn leave(&mut self, reason: AbandonReason) {
        let result = tokio::time::timeout(
            self.options.snapshot_timeout,
            self.controller.abandon(reason),
        )
        .await;
        match result {
            Ok(Ok(Some(outcome))) if outcome.can_resume => {
                println!("Progress saved. Run `hometrain session` to resume.")
            }
            Ok(Ok(_)) => println!("Session closed."),
            Ok(Err(err)) => println!("Could not close the session: {err}"),
            Err(_) => println!("Saving progress timed out."),
        }
    }

    /// Exit without closing the session. Unsynced progress goes out through
    /// the monitor; `run` waits for it before returning.
    async fn unload(&self) {
        self.send_signal(EnvironmentSignal::Unload).await;
        println!("Progress kept. Run `hometrain session` to resume.");
    }

    async fn send_signal(&self, signal: EnvironmentSignal) {
        if self.signals.send(signal).await.is_err() {
            tracing::warn!("[CLI] Abandonment monitor is not running");
        }
    }

    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        if !self.input_open {
            return Ok(None);
        }
        print!("{text}");
        std::io::stdout().flush()?;
        let line = self.input.next_line().await?;
        if line.is_none() {
            self.input_open = false;
        }
        Ok(line.map(|l| l.trim().to_string()))
    }

    // ============================================================================
    // Output
    // ============================================================================

    fn print_plan(&self) {
        let Some(plan) = self.controller.plan() else {
            return;
        };
        println!();
        if let Some(message) = &plan.plan.message {
            println!("{message}");
        }
        for (index, exercise) in plan.plan.exercises.iter().enumerate() {
            println!(
                "  {}. {:<28} {} x {}, rest {}s",
                index + 1,
                exercise.name,
                exercise.target_series,
                describe_target(exercise.target),
                exercise.rest_seconds
            );
        }
    }

    async fn print_current(&self) {
        let Some(exercise) = self.controller.current_exercise() else {
            return;
        };
        let index = self.controller.current_index();
        println!(
            "\n[{}/{}] {}: {} x {} (rest {}s)",
            index + 1,
            self.controller.exercises().len(),
            exercise.name,
            exercise.target_series,
            describe_target(exercise.target),
            exercise.rest_seconds
        );
        if !exercise.notes.is_empty() {
            println!("  {}", exercise.notes);
        }
        let ledger = self.controller.ledger();
        if let Some(progress) = ledger.read().await.get(index)
            && progress.series_completed > 0
        {
            println!(
                "  {}/{} series done",
                progress.series_completed, progress.total_series
            );
        }
    }

    async fn print_summary(&self) {
        println!(
            "\nSession complete: {:.0}% of the plan done.",
            self.controller.completion_percentage().await
        );
        for progress in self.controller.progress().await {
            println!(
                "  {}. {:<28} {} {}/{}",
                progress.exercise_order + 1,
                progress.exercise_name,
                progress.status,
                progress.series_completed,
                progress.total_series
            );
        }
        if let Some(warmup) = self.controller.warmup_summary() {
            println!(
                "  Warm-up: {}/{} steps in {}s{}",
                warmup.steps_completed,
                warmup.total_steps,
                warmup.seconds_spent,
                if warmup.skipped { " (skipped)" } else { "" }
            );
        }
    }
}

fn fatal_if_auth(err: &HomeTrainError) -> Result<()> {
    if matches!(err, HomeTrainError::AuthExpired) {
        return Err(anyhow!("{err}. Log in again and rerun the command."));
    }
    Ok(())
}

fn describe_target(target: ExerciseTarget) -> String {
    match target {
        ExerciseTarget::Reps(reps) => format!("{reps} reps"),
        ExerciseTarget::DurationSeconds(seconds) => format!("{seconds}s"),
    }
}

fn print_warmup_signal(steps: &[WarmupStep], signal: WarmupSignal) {
    match signal {
        WarmupSignal::Tick { remaining, .. } if remaining % 10 == 0 || remaining <= 3 => {
            println!("  {remaining}s");
        }
        WarmupSignal::StepFinished { index } => {
            if let Some(next) = steps.get(index + 1) {
                println!(
                    "  {}. {} ({}s): {}",
                    index + 2,
                    next.name,
                    next.duration_seconds,
                    next.description
                );
            }
        }
        WarmupSignal::Completed(summary) => println!(
            "Warm-up done: {}/{} steps.",
            summary.steps_completed, summary.total_steps
        ),
        WarmupSignal::Tick { .. } | WarmupSignal::Idle => {}
    }
}

fn print_help() {
    println!("  c [secs]   exercise done (optionally with its duration)");
    println!("  p N        N series done so far");
    println!("  s          skip exercise");
    println!("  x [secs]   stop exercise early");
    println!("  f love|hard|dislike [comment]");
    println!("  r          never show this exercise again");
    println!("  g          drop this plan and generate a new one");
    println!("  bg / fg    pause and resume");
    println!("  q          save and quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_input() {
        assert_eq!(
            SessionInput::parse("c 95"),
            Some(SessionInput::Finish(ExerciseResult::Completed, Some(95)))
        );
        assert_eq!(
            SessionInput::parse("skip"),
            Some(SessionInput::Finish(ExerciseResult::Skipped, None))
        );
        assert_eq!(SessionInput::parse("p 2"), Some(SessionInput::Series(2)));
        assert_eq!(SessionInput::parse("p"), None);
        assert_eq!(
            SessionInput::parse("f HARD too many reps"),
            Some(SessionInput::Feedback(ExerciseFeedback {
                sentiment: FeedbackSentiment::Hard,
                comment: Some("too many reps".into()),
            }))
        );
        assert_eq!(SessionInput::parse("  "), None);
        assert_eq!(SessionInput::parse("bg"), Some(SessionInput::Background));
    }
}
