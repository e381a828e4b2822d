// src/macros.rs

//
// Logging macros
//
// `logging` feature enabled  → tracing, target "service_broker"
// `logging` feature disabled → only log_error prints (stderr), the rest compile away
//
// log_frame! traces wire traffic in both directions:
//   log_frame!(">>", header, payload)   outbound
//   log_frame!("<<", header, payload)   inbound
//

#![allow(unused_macros)]

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "service_broker", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!("service_broker: {}", format_args!($($arg)*))
    };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "service_broker", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "service_broker", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "service_broker", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "logging")]
macro_rules! log_frame {
    ($dir:literal, $header:expr, $payload:expr) => {
        tracing::debug!(
            target: "service_broker::wire",
            "{} {} {}",
            $dir,
            serde_json::Value::Object($header.clone()),
            $payload.unwrap_or("")
        )
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_frame {
    ($dir:literal, $header:expr, $payload:expr) => {{
        let _ = (&$header, &$payload);
    }};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_frame;
pub(crate) use log_info;
pub(crate) use log_warn;
