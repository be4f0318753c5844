use std::error::Error;
use std::path::PathBuf;

use url::Url;

use crate::state::AppState;

const DEFAULT_REMOTE: &str = "http://localhost:3000";

/// Resolve the URL of a running daemon.
///
/// Priority: explicit `--remote` flag > config file `listen_port` > port 3000.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Option<Url> {
    if let Some(url) = explicit {
        return Some(url);
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = Url::parse(&format!("http://localhost:{}", state.config.listen_port)) {
            return Some(url);
        }
    }
    Url::parse(DEFAULT_REMOTE).ok()
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Where a running daemon is reachable, if it could be resolved
    pub remote: Option<Url>,
    /// Optional custom config path (defaults to ~/.sharedsecret)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(remote: Option<Url>, config_path: Option<PathBuf>) -> Self {
        Self {
            remote,
            config_path,
        }
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
