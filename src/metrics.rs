use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static::lazy_static! {
    pub static ref BUILDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "skyhook_builds_total", "Completed index builds", &["path"]
    ).unwrap();
    pub static ref FALLBACKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "skyhook_fallbacks_total", "Remote build attempts that fell back to local", &["stage", "kind"]
    ).unwrap();
    pub static ref BUILD_DURATION: HistogramVec = register_histogram_vec!(
        "skyhook_build_duration_seconds", "Index build duration", &["path"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 3600.0]
    ).unwrap();
    pub static ref LOCAL_BUILD_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "skyhook_local_build_failures_total", "Local builds that failed"
    ).unwrap();
    pub static ref UPLOADED_BYTES_TOTAL: IntCounter = register_int_counter!(
        "skyhook_uploaded_bytes_total", "Bytes of vectors and doc ids staged for remote builds"
    ).unwrap();
}

pub fn init() {
    lazy_static::initialize(&BUILDS_TOTAL);
    lazy_static::initialize(&FALLBACKS_TOTAL);
    lazy_static::initialize(&BUILD_DURATION);
    lazy_static::initialize(&LOCAL_BUILD_FAILURES_TOTAL);
    lazy_static::initialize(&UPLOADED_BYTES_TOTAL);
}
