use crate::report::Verbosity;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 로그 필터를 읽는 환경 변수
pub const LOG_ENV: &str = "PREFIX_MODULES_LOG";

/// stderr 로그 초기화
///
/// `PREFIX_MODULES_LOG`가 있으면 그대로 쓰고, 없으면 `--verbose`일 때 debug, 아니면 warn.
/// quiet에서는 error만 남깁니다. 두 번 호출되어도 실패하지 않습니다.
pub fn init(verbosity: Verbosity) {
    let fallback = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
