use crate::state::cache::{CachedSeason, SeasonCache};
use crate::state::messages::{NetworkRequest, NetworkResponse, SeasonTicket};
use chrono::Utc;
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use mnps_api::client::{ApiResult, SleeperApi};
use mnps_api::{FIRST_WEEK, LAST_WEEK, RawMatchupRecord, WeekNumber};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

/// Weeks requested concurrently.
const WEEK_BATCH: usize = 4;
/// Extra attempts for a failed week before it is reported.
const WEEK_RETRIES: usize = 2;
const RETRY_DELAY: Duration = Duration::from_millis(750);

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self {
            is_loading: false,
            spinner_char: ' ',
        }
    }
}

/// Spinner shared by the worker and the season loads it spawns.
#[derive(Clone)]
struct Spinner {
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl Spinner {
    async fn start(&self) {
        // Already spinning for an aborted load; keep the existing task.
        if self.is_loading.swap(true, Ordering::Relaxed) {
            return;
        }

        let mut loading_state = LoadingState {
            is_loading: true,
            spinner_char: SPINNER_CHARS[0],
        };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState {
                    is_loading: false,
                    spinner_char,
                },
            })
            .await;
    }
}

pub struct NetworkWorker {
    client: SleeperApi,
    cache: Arc<dyn SeasonCache>,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    spinner: Spinner,
    in_flight: Option<JoinHandle<()>>,
}

impl NetworkWorker {
    pub fn new(
        client: SleeperApi,
        cache: Arc<dyn SeasonCache>,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        let spinner = Spinner {
            responses: responses.clone(),
            is_loading: Arc::new(AtomicBool::new(false)),
        };
        Self {
            client,
            cache,
            requests,
            responses,
            spinner,
            in_flight: None,
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request {
                NetworkRequest::LoadHistory { league } => {
                    self.spinner.start().await;
                    debug!("loading history for league {}", league.league_id);
                    let result = self.client.fetch_league_history(&league.league_id).await;
                    self.spinner.stop(result.is_ok()).await;

                    let response = match result {
                        Ok(seasons) => NetworkResponse::HistoryLoaded { league, seasons },
                        Err(e) => NetworkResponse::Error {
                            ticket: None,
                            message: e.to_string(),
                        },
                    };
                    if let Err(e) = self.responses.send(response).await {
                        error!("Failed to send network response: {e}");
                        break;
                    }
                }
                NetworkRequest::LoadSeason {
                    ticket,
                    complete,
                    force_refresh,
                } => {
                    if let Some(previous) = self.in_flight.take()
                        && !previous.is_finished()
                    {
                        debug!("cancelling season load in flight");
                        previous.abort();
                    }
                    let load = SeasonLoad {
                        client: self.client.clone(),
                        cache: self.cache.clone(),
                        responses: self.responses.clone(),
                        spinner: self.spinner.clone(),
                        ticket,
                        complete,
                        force_refresh,
                    };
                    self.in_flight = Some(tokio::spawn(load.run()));
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

/// Week numbers in fetch order, grouped into concurrent batches.
fn week_batches() -> Vec<Vec<WeekNumber>> {
    let weeks: Vec<WeekNumber> = (FIRST_WEEK..=LAST_WEEK).collect();
    weeks.chunks(WEEK_BATCH).map(<[WeekNumber]>::to_vec).collect()
}

fn any_scored(records: &[RawMatchupRecord]) -> bool {
    records.iter().any(|r| r.points.is_some_and(|p| p > 0.0))
}

/// One season load, run as its own task so a newer request can abort it.
struct SeasonLoad {
    client: SleeperApi,
    cache: Arc<dyn SeasonCache>,
    responses: mpsc::Sender<NetworkResponse>,
    spinner: Spinner,
    ticket: SeasonTicket,
    complete: bool,
    force_refresh: bool,
}

impl SeasonLoad {
    async fn run(self) {
        self.spinner.start().await;
        let ok = self.load().await;
        self.spinner.stop(ok).await;
    }

    async fn load(&self) -> bool {
        let key = &self.ticket.key;

        if !self.force_refresh
            && let Some(cached) = self.restore().await
        {
            let done = cached.complete;
            self.send(NetworkResponse::SeasonRestored {
                ticket: self.ticket.clone(),
                cached,
            })
            .await;
            // A finished season never changes; an in-progress one is shown
            // from cache while fresh weeks come in.
            if done {
                info!("{key} restored from cache");
                self.send(NetworkResponse::SeasonFinished {
                    ticket: self.ticket.clone(),
                })
                .await;
                return true;
            }
        }

        let (rosters, users) = match self.client.fetch_directory_sources(&key.league_id).await {
            Ok(sources) => sources,
            Err(e) => {
                self.send_error(format!("Could not load teams for {key}: {e}"))
                    .await;
                return false;
            }
        };
        self.send(NetworkResponse::DirectoryLoaded {
            ticket: self.ticket.clone(),
            rosters: rosters.clone(),
            users: users.clone(),
        })
        .await;

        let mut fetched: BTreeMap<WeekNumber, Vec<RawMatchupRecord>> = BTreeMap::new();
        let mut failed: Vec<WeekNumber> = Vec::new();

        for batch in week_batches() {
            let results = join_all(batch.iter().map(|&week| self.fetch_week(week))).await;

            let mut weeks = Vec::with_capacity(batch.len());
            let mut scored = false;
            for (week, result) in batch.iter().copied().zip(results) {
                match result {
                    Ok(records) => {
                        scored |= any_scored(&records);
                        fetched.insert(week, records.clone());
                        weeks.push((week, records));
                    }
                    Err(e) => {
                        warn!("week {week} of {key} unavailable: {e}");
                        failed.push(week);
                    }
                }
            }

            if !weeks.is_empty() {
                self.send(NetworkResponse::WeeksLoaded {
                    ticket: self.ticket.clone(),
                    weeks,
                })
                .await;
            }

            if !self.complete && !scored {
                debug!("no scores in weeks {batch:?} of {key}, stopping");
                break;
            }
        }

        if !failed.is_empty() {
            self.send_error(format!("Could not load week(s) {failed:?} of {key}"))
                .await;
        }

        self.send(NetworkResponse::SeasonFinished {
            ticket: self.ticket.clone(),
        })
        .await;

        if failed.is_empty() {
            let season = CachedSeason {
                key: key.clone(),
                complete: self.complete,
                rosters,
                users,
                weeks: fetched,
                fetched_at: Utc::now(),
            };
            self.store(season).await;
        }

        failed.is_empty()
    }

    async fn fetch_week(&self, week: WeekNumber) -> ApiResult<Vec<RawMatchupRecord>> {
        let league_id = &self.ticket.key.league_id;
        let mut attempt = 0;
        loop {
            match self.client.fetch_week(league_id, week).await {
                Ok(records) => return Ok(records),
                Err(e) if attempt < WEEK_RETRIES => {
                    attempt += 1;
                    debug!("week {week} attempt {attempt} failed, retrying: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Cache reads and writes touch the filesystem, so they run on the
    /// blocking pool.
    async fn restore(&self) -> Option<CachedSeason> {
        let cache = Arc::clone(&self.cache);
        let key = self.ticket.key.clone();
        match tokio::task::spawn_blocking(move || cache.load(&key)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("cache lookup for {} did not finish: {e}", self.ticket.key);
                None
            }
        }
    }

    async fn store(&self, season: CachedSeason) {
        let cache = Arc::clone(&self.cache);
        let key = season.key.clone();
        match tokio::task::spawn_blocking(move || cache.save(&season)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("could not cache {key}: {e}"),
            Err(e) => warn!("cache write for {key} did not finish: {e}"),
        }
    }

    async fn send(&self, response: NetworkResponse) {
        if let Err(e) = self.responses.send(response).await {
            error!("Failed to send network response: {e}");
        }
    }

    async fn send_error(&self, message: String) {
        self.send(NetworkResponse::Error {
            ticket: Some(self.ticket.clone()),
            message,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cache::NoCache;
    use mnps_api::{LeagueVariant, SeasonKey};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    /// Serves one stored season and remembers which thread read it.
    struct StoredSeason {
        season: CachedSeason,
        read_on: Mutex<Option<ThreadId>>,
    }

    impl SeasonCache for StoredSeason {
        fn load(&self, key: &SeasonKey) -> Option<CachedSeason> {
            *self.read_on.lock().unwrap() = Some(thread::current().id());
            (self.season.key == *key).then(|| self.season.clone())
        }

        fn save(&self, _season: &CachedSeason) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn load_for(
        client: SleeperApi,
        cache: Arc<dyn SeasonCache>,
        ticket: SeasonTicket,
        complete: bool,
    ) -> (SeasonLoad, mpsc::Receiver<NetworkResponse>) {
        let (tx, rx) = mpsc::channel(256);
        let load = SeasonLoad {
            client,
            cache,
            responses: tx.clone(),
            spinner: Spinner {
                responses: tx,
                is_loading: Arc::new(AtomicBool::new(false)),
            },
            ticket,
            complete,
            force_refresh: false,
        };
        (load, rx)
    }

    #[test]
    fn batches_cover_the_season_in_order() {
        let batches = week_batches();
        assert_eq!(batches.len(), 5);
        assert_eq!(batches[0], vec![1, 2, 3, 4]);
        assert_eq!(batches[4], vec![17]);
        let flat: Vec<WeekNumber> = batches.into_iter().flatten().collect();
        assert_eq!(flat, (1..=17).collect::<Vec<_>>());
    }

    #[test]
    fn null_and_zero_points_are_unscored() {
        let unscored = [
            RawMatchupRecord::new(1, 0.0),
            RawMatchupRecord {
                team_id: None,
                points: None,
            },
        ];
        assert!(!any_scored(&unscored));
        assert!(any_scored(&[RawMatchupRecord::new(2, 0.5)]));
    }

    async fn drain(rx: &mut mpsc::Receiver<NetworkResponse>) -> Vec<NetworkResponse> {
        let mut out = Vec::new();
        while let Ok(Some(resp)) =
            tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
        {
            out.push(resp);
        }
        out
    }

    fn matchups(points: &[f64]) -> String {
        let rows: Vec<String> = points
            .iter()
            .enumerate()
            .map(|(i, p)| format!(r#"{{"roster_id": {}, "matchup_id": 1, "points": {p}}}"#, i + 1))
            .collect();
        format!("[{}]", rows.join(","))
    }

    #[tokio::test]
    async fn in_progress_season_stops_after_unscored_batch() {
        let mut server = mockito::Server::new_async().await;
        let _rosters = server
            .mock("GET", "/league/111/rosters")
            .with_body(r#"[{"roster_id": 1, "owner_id": "u1"}, {"roster_id": 2, "owner_id": null}]"#)
            .create_async()
            .await;
        let _users = server
            .mock("GET", "/league/111/users")
            .with_body(r#"[{"user_id": "u1", "display_name": "Alpha"}]"#)
            .create_async()
            .await;
        for week in 1..=2 {
            server
                .mock("GET", format!("/league/111/matchups/{week}").as_str())
                .with_body(matchups(&[100.0, 90.0]))
                .create_async()
                .await;
        }
        let _unplayed = server
            .mock("GET", mockito::Matcher::Regex(r"^/league/111/matchups/[3-8]$".into()))
            .with_body(matchups(&[0.0, 0.0]))
            .create_async()
            .await;
        let late = server
            .mock("GET", mockito::Matcher::Regex(r"^/league/111/matchups/(9|1\d)$".into()))
            .expect(0)
            .create_async()
            .await;

        let ticket = SeasonTicket {
            key: SeasonKey::new("111", 2025, LeagueVariant::Redraft),
            generation: 1,
        };
        let (load, mut rx) = load_for(
            SleeperApi::with_base_url(server.url()),
            Arc::new(NoCache),
            ticket.clone(),
            false,
        );
        assert!(load.load().await);

        let responses = drain(&mut rx).await;
        let weeks: Vec<WeekNumber> = responses
            .iter()
            .filter_map(|r| match r {
                NetworkResponse::WeeksLoaded { weeks, .. } => Some(weeks.iter().map(|(w, _)| *w)),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(weeks, (1..=8).collect::<Vec<_>>());
        assert!(matches!(responses.first(), Some(NetworkResponse::DirectoryLoaded { .. })));
        assert!(matches!(
            responses.last(),
            Some(NetworkResponse::SeasonFinished { ticket: t }) if *t == ticket
        ));
        late.assert_async().await;
    }

    #[tokio::test]
    async fn complete_season_restores_from_cache_off_the_runtime_thread() {
        let ticket = SeasonTicket {
            key: SeasonKey::new("111", 2023, LeagueVariant::Redraft),
            generation: 4,
        };
        let cache = Arc::new(StoredSeason {
            season: CachedSeason {
                key: ticket.key.clone(),
                complete: true,
                rosters: Vec::new(),
                users: Vec::new(),
                weeks: BTreeMap::from([(1, vec![RawMatchupRecord::new(1, 88.0)])]),
                fetched_at: Utc::now(),
            },
            read_on: Mutex::new(None),
        });
        // Nothing listens here; a complete cached season never goes to the network.
        let (load, mut rx) = load_for(
            SleeperApi::with_base_url("http://127.0.0.1:9"),
            cache.clone(),
            ticket.clone(),
            true,
        );
        assert!(load.load().await);

        let responses = drain(&mut rx).await;
        assert!(matches!(
            responses.first(),
            Some(NetworkResponse::SeasonRestored { ticket: t, .. }) if *t == ticket
        ));
        assert!(matches!(responses.last(), Some(NetworkResponse::SeasonFinished { .. })));

        let read_on = cache.read_on.lock().unwrap().expect("cache was read");
        assert_ne!(read_on, thread::current().id());
    }
}
