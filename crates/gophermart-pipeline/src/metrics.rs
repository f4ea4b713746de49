/// Pipeline-wide Prometheus counters and histogram, registered once at
/// startup and shared by the Processor, Supervisor, and Submission Hook.
pub struct Metrics {
    pub orders_submitted_total: prometheus::IntCounter,
    pub orders_processed_total: prometheus::IntCounter,
    pub orders_invalidated_total: prometheus::IntCounter,
    pub accrual_requests_total: prometheus::IntCounter,
    pub accrual_rate_limited_total: prometheus::IntCounter,
    pub order_processing_duration_seconds: prometheus::Histogram,
}

impl Metrics {
    pub fn new(registry: &prometheus::Registry) -> Self {
        let orders_submitted_total = prometheus::IntCounter::new(
            "gophermart_orders_submitted_total",
            "Orders submitted to the worker pool",
        )
        .unwrap();
        let orders_processed_total = prometheus::IntCounter::new(
            "gophermart_orders_processed_total",
            "Orders that reached PROCESSED",
        )
        .unwrap();
        let orders_invalidated_total = prometheus::IntCounter::new(
            "gophermart_orders_invalidated_total",
            "Orders that reached INVALID",
        )
        .unwrap();
        let accrual_requests_total = prometheus::IntCounter::new(
            "gophermart_accrual_requests_total",
            "Calls made to the accrual service",
        )
        .unwrap();
        let accrual_rate_limited_total = prometheus::IntCounter::new(
            "gophermart_accrual_rate_limited_total",
            "Accrual calls that returned 429",
        )
        .unwrap();
        let order_processing_duration_seconds = prometheus::Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "gophermart_order_processing_duration_seconds",
                "Wall time spent driving one order through the processor",
            ),
        )
        .unwrap();

        registry
            .register(Box::new(orders_submitted_total.clone()))
            .unwrap();
        registry
            .register(Box::new(orders_processed_total.clone()))
            .unwrap();
        registry
            .register(Box::new(orders_invalidated_total.clone()))
            .unwrap();
        registry
            .register(Box::new(accrual_requests_total.clone()))
            .unwrap();
        registry
            .register(Box::new(accrual_rate_limited_total.clone()))
            .unwrap();
        registry
            .register(Box::new(order_processing_duration_seconds.clone()))
            .unwrap();

        Self {
            orders_submitted_total,
            orders_processed_total,
            orders_invalidated_total,
            accrual_requests_total,
            accrual_rate_limited_total,
            order_processing_duration_seconds,
        }
    }
}
