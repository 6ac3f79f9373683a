use log::LevelFilter;
use mnps_api::LeagueVariant;
use std::path::PathBuf;

/// League opened when nothing is configured.
pub const DEFAULT_LEAGUE_ID: &str = "1243379119207497728";

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueConfig {
    pub league_id: String,
    pub variant: LeagueVariant,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    /// Leagues cycled with `L`. Never empty; the first entry opens on start.
    pub leagues: Vec<LeagueConfig>,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            leagues: vec![LeagueConfig {
                league_id: DEFAULT_LEAGUE_ID.to_string(),
                variant: LeagueVariant::Redraft,
            }],
            cache_dir: PathBuf::from(".mnps-cache"),
            use_cache: true,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CliAction {
    #[default]
    Run,
    Help,
    Version,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub action: CliAction,
    pub league_id: Option<String>,
    pub dynasty: bool,
    pub no_cache: bool,
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Build settings from an environment lookup.
    ///
    /// - `MNPS_LEAGUE_ID`, `MNPS_LEAGUE_VARIANT`: the league opened first
    /// - `MNPS_LEAGUES`: more leagues as `id:variant`, comma separated
    /// - `MNPS_CACHE_DIR`: season cache location
    /// - `MNPS_LOG_LEVEL`: error | warn | info | debug | trace
    pub fn from_env(env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let primary = LeagueConfig {
            league_id: non_empty("MNPS_LEAGUE_ID")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_LEAGUE_ID.to_string()),
            variant: non_empty("MNPS_LEAGUE_VARIANT")
                .and_then(|v| LeagueVariant::parse(&v))
                .unwrap_or_default(),
        };

        let mut leagues = vec![primary];
        if let Some(extra) = non_empty("MNPS_LEAGUES") {
            for league in extra.split(',').filter_map(parse_league_entry) {
                if !leagues.iter().any(|l| l.league_id == league.league_id) {
                    leagues.push(league);
                }
            }
        }

        let cache_dir = non_empty("MNPS_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_cache_dir(&non_empty));

        Self {
            full_screen: false,
            log_level: non_empty("MNPS_LOG_LEVEL").and_then(|v| v.trim().parse().ok()),
            leagues,
            cache_dir,
            use_cache: true,
        }
    }

    pub fn apply_cli(&mut self, cli: &CliOptions) {
        if let Some(id) = cli.league_id.as_deref() {
            let variant = if cli.dynasty {
                LeagueVariant::Dynasty
            } else {
                LeagueVariant::Redraft
            };
            self.leagues.retain(|l| l.league_id != id);
            self.leagues.insert(
                0,
                LeagueConfig {
                    league_id: id.to_string(),
                    variant,
                },
            );
        } else if cli.dynasty {
            self.leagues[0].variant = LeagueVariant::Dynasty;
        }
        if cli.no_cache {
            self.use_cache = false;
        }
    }
}

/// `id` or `id:variant`.
fn parse_league_entry(entry: &str) -> Option<LeagueConfig> {
    let entry = entry.trim();
    if entry.is_empty() {
        return None;
    }
    let (id, variant) = match entry.split_once(':') {
        Some((id, variant)) => (id.trim(), LeagueVariant::parse(variant)?),
        None => (entry, LeagueVariant::Redraft),
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(LeagueConfig {
        league_id: id.to_string(),
        variant,
    })
}

fn default_cache_dir(env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(cache_home) = env("XDG_CACHE_HOME") {
        return PathBuf::from(cache_home).join("mnps");
    }
    if let Some(home) = env("HOME") {
        return PathBuf::from(home).join(".cache").join("mnps");
    }
    PathBuf::from(".mnps-cache")
}

pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => opts.action = CliAction::Help,
            "-V" | "--version" => opts.action = CliAction::Version,
            "--dynasty" => opts.dynasty = true,
            "--no-cache" => opts.no_cache = true,
            "-l" | "--league" => {
                let id = args
                    .next()
                    .ok_or_else(|| format!("{arg} needs a league id"))?;
                opts.league_id = Some(id);
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    Ok(opts)
}
