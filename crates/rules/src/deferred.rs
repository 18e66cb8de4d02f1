//! Asynchronous validation passes and their error aggregation.

use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::Arc,
};

use futures::{
    FutureExt,
    future::{self, join_all},
};
use tracing::{debug, trace};

use crate::{Deferred, Error, ErrorPatch, Outcome};

/// User aggregation: receives the path and every rejection reason, in declaration order.
pub type AggregateFn = Arc<dyn Fn(&str, &[String]) -> String + Send + Sync>;

/// Separator used by [`AsyncStrategy::Join`].
pub const JOIN_SEPARATOR: &str = ", ";

/// How several rejections for one path become one message.
#[derive(Clone, Default)]
pub enum AsyncStrategy {
    /// The first rejection in declaration order wins.
    #[default]
    TakeFirst,
    /// All rejections, joined with [`JOIN_SEPARATOR`].
    Join,
    /// A user function.
    Custom(AggregateFn),
}

impl AsyncStrategy {
    /// Wrap an aggregation function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &[String]) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Resolve a strategy name as written in config files.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "takeFirst" => Ok(Self::TakeFirst),
            "join" => Ok(Self::Join),
            _ => Err(Error::UnknownAsyncStrategy {
                name: name.to_string(),
            }),
        }
    }

    /// Combine the rejection reasons for `path`. `None` when nothing was rejected.
    pub fn aggregate(&self, path: &str, reasons: &[String]) -> Option<String> {
        let first = reasons.first()?;
        let msg = match self {
            Self::TakeFirst => first.clone(),
            Self::Join => reasons.join(JOIN_SEPARATOR),
            Self::Custom(f) => f(path, reasons),
        };
        Some(msg).filter(|m| !m.is_empty())
    }
}

impl FromStr for AsyncStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Debug for AsyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeFirst => f.write_str("TakeFirst"),
            Self::Join => f.write_str("Join"),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Checks collected for one asynchronous pass, not yet awaited.
///
/// Collection is synchronous, so unknown rules fail before anything is in flight.
#[derive(Default)]
pub struct AsyncPass {
    /// Every concrete path checked, in visiting order.
    paths: Vec<String>,
    /// Pending checks paired with the path they judge.
    checks: Vec<(String, Deferred)>,
}

impl AsyncPass {
    /// Record that `path` takes part in this pass, even if no check is pending for it.
    pub fn visit(&mut self, path: &str) {
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_string());
        }
    }

    /// Add one outcome for `path`. Valid outcomes need no waiting.
    pub fn push(&mut self, path: &str, outcome: Outcome) {
        let check = match outcome {
            Outcome::Valid => return,
            Outcome::Invalid(msg) => future::ready(Err(msg)).boxed(),
            Outcome::Deferred(check) => check,
        };
        self.checks.push((path.to_string(), check));
    }

    /// Number of pending checks per path.
    pub fn in_flight(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for (path, _) in &self.checks {
            *out.entry(path.clone()).or_insert(0) += 1;
        }
        out
    }

    /// Paths this pass will report on.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// True when no path was visited.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Await every check, then aggregate rejections per path.
    ///
    /// All checks run concurrently and the pass waits for all of them to settle, even
    /// after an early rejection. Every visited path gets a verdict: visited paths with
    /// no rejection are cleared.
    pub async fn settle(self, strategy: &AsyncStrategy) -> ErrorPatch {
        let Self { paths, checks } = self;
        debug!(paths = paths.len(), checks = checks.len(), "async pass started");
        let settled = join_all(
            checks
                .into_iter()
                .map(|(path, check)| check.map(move |r| (path, r))),
        )
        .await;

        let mut reasons: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (path, result) in settled {
            if let Err(reason) = result {
                trace!(path = %path, reason = %reason, "async check rejected");
                reasons.entry(path).or_default().push(reason);
            }
        }

        let patch: ErrorPatch = paths
            .into_iter()
            .map(|path| {
                let verdict = reasons
                    .get(&path)
                    .and_then(|r| strategy.aggregate(&path, r));
                (path, verdict)
            })
            .collect();
        debug!(
            failed = patch.values().filter(|v| v.is_some()).count(),
            "async pass settled"
        );
        patch
    }
}
