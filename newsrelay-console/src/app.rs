use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Local};
use newsrelay_core::{
    Command, CommandError, CommandReply, CycleOutcome, CycleReport, DestinationId, LoopState,
    RelayService, TenantId,
};
use tokio::sync::watch;

/// Oldest activity lines are dropped beyond this.
const MAX_ACTIVITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActivityKind {
    Cycle,
    Article,
    Reply,
    Failure,
}

#[derive(Debug, Clone)]
pub(crate) struct ActivityLine {
    pub at: DateTime<Local>,
    pub kind: ActivityKind,
    pub text: String,
}

pub(crate) struct App {
    pub service: Arc<RelayService>,
    pub loop_state: watch::Receiver<LoopState>,

    pub destinations: Vec<(TenantId, DestinationId)>,
    pub activity: VecDeque<ActivityLine>,
    pub input: String,

    pub is_busy: bool,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) async fn new(
        service: Arc<RelayService>,
        loop_state: watch::Receiver<LoopState>,
    ) -> Self {
        let destinations = service.destinations().await;
        Self {
            service,
            loop_state,
            destinations,
            activity: VecDeque::new(),
            input: String::new(),
            is_busy: false,
            error_message: None,
        }
    }

    pub(crate) fn state(&self) -> LoopState {
        *self.loop_state.borrow()
    }

    pub(crate) async fn refresh_destinations(&mut self) {
        self.destinations = self.service.destinations().await;
    }

    /// Parse the command line, clearing it only when it parsed.
    pub(crate) fn take_command(&mut self) -> Result<Command, CommandError> {
        let command = self.input.parse::<Command>()?;
        self.input.clear();
        Ok(command)
    }

    pub(crate) fn record_cycle(&mut self, report: &CycleReport) {
        match &report.outcome {
            CycleOutcome::FetchFailed(reason) => {
                self.push(ActivityKind::Failure, format!("News check failed: {reason}"));
            }
            CycleOutcome::NothingNew => {
                self.push(
                    ActivityKind::Cycle,
                    format!("Checked {} articles, nothing new", report.fetched),
                );
            }
            CycleOutcome::Dispatched => {
                self.push(
                    ActivityKind::Cycle,
                    format!(
                        "{} new article(s) to {} channel(s): {} sent, {} failed",
                        report.new_items.len(),
                        report.destinations,
                        report.delivered,
                        report.failed
                    ),
                );
                for item in &report.new_items {
                    self.push(
                        ActivityKind::Article,
                        format!("{} - {}", item.title, item.link()),
                    );
                }
            }
        }
    }

    pub(crate) fn record_reply(&mut self, reply: &CommandReply) {
        let kind = match reply {
            CommandReply::SourceUnavailable(_) => ActivityKind::Failure,
            _ => ActivityKind::Reply,
        };
        if let CommandReply::Registered {
            tenant,
            replaced: Some(previous),
            ..
        } = reply
        {
            self.push(
                ActivityKind::Reply,
                format!("Server {tenant} no longer posts to channel {previous}"),
            );
        }
        for line in reply.to_string().lines() {
            self.push(kind, line.to_owned());
        }
    }

    fn push(&mut self, kind: ActivityKind, text: String) {
        if self.activity.len() == MAX_ACTIVITY {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityLine {
            at: Local::now(),
            kind,
            text,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use newsrelay_core::{
        DestinationRegistry, Item, PortError, SeenTracker, SourcePort,
    };

    use super::*;

    struct EmptySource;

    #[async_trait]
    impl SourcePort for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch(&self) -> Result<Vec<Item>, PortError> {
            Ok(Vec::new())
        }
    }

    /// App over an empty source and registry.
    pub(crate) async fn app() -> App {
        let service = RelayService::new(
            Arc::new(EmptySource),
            Arc::new(DestinationRegistry::new()),
            SeenTracker::new().view(),
        );
        let (_tx, rx) = watch::channel(LoopState::Idle);
        App::new(Arc::new(service), rx).await
    }

    fn texts(app: &App) -> Vec<&str> {
        app.activity.iter().map(|line| line.text.as_str()).collect()
    }

    #[tokio::test]
    async fn bad_command_keeps_the_input() {
        let mut app = app().await;
        app.input = "/setnewschannel 1".into();
        assert_eq!(
            app.take_command(),
            Err(CommandError::MissingArgument("channel"))
        );
        assert_eq!(app.input, "/setnewschannel 1");

        app.input = "/fetchnews".into();
        assert_eq!(app.take_command(), Ok(Command::FetchNow));
        assert!(app.input.is_empty());
    }

    #[tokio::test]
    async fn dispatched_cycle_lists_articles() {
        let mut app = app().await;
        app.record_cycle(&CycleReport {
            fetched: 3,
            new_items: vec![Item::new("https://example.com/a", "A")],
            destinations: 2,
            delivered: 1,
            failed: 1,
            outcome: CycleOutcome::Dispatched,
        });

        assert_eq!(
            texts(&app),
            vec![
                "1 new article(s) to 2 channel(s): 1 sent, 1 failed",
                "A - https://example.com/a",
            ]
        );
    }

    #[tokio::test]
    async fn registration_reply_refreshes_destinations() {
        let mut app = app().await;
        let reply = app
            .service
            .execute(Command::RegisterDestination {
                tenant: TenantId::from("g"),
                destination: DestinationId::from("c"),
            })
            .await;
        app.record_reply(&reply);
        app.refresh_destinations().await;

        assert_eq!(texts(&app), vec!["News updates will be posted in <#c>!"]);
        assert_eq!(
            app.destinations,
            vec![(TenantId::from("g"), DestinationId::from("c"))]
        );
    }

    #[tokio::test]
    async fn activity_is_bounded() {
        let mut app = app().await;
        for _ in 0..(MAX_ACTIVITY + 5) {
            app.record_reply(&CommandReply::NoNewArticles);
        }
        assert_eq!(app.activity.len(), MAX_ACTIVITY);
    }
}
