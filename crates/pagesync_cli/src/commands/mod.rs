pub(crate) mod check;
pub(crate) mod configs;
pub(crate) mod migrate;
pub(crate) mod run;
pub(crate) mod shared;
pub(crate) mod stale;
pub(crate) mod watch;
