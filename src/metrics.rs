use lazy_static::lazy_static;
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

lazy_static! {
    pub static ref OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "balance_operations_total",
        "Balance operations processed, by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap();
    pub static ref OPERATION_DURATION_SECONDS: Histogram = register_histogram!(
        "balance_operation_duration_seconds",
        "Time spent inside the balance mutation transaction"
    )
    .unwrap();
}
