use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("luna.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("luna.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("luna.client.request_duration_seconds");

pub(crate) static STREAM_RECORDS: Counter = Counter::new("luna.stream.records");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("luna.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("luna.stream.bytes");

pub(crate) static IDENTITY_REQUESTS: Counter = Counter::new("luna.identity.requests");
pub(crate) static IDENTITY_FAILURES: Counter = Counter::new("luna.identity.failures");

pub(crate) static EXCHANGES: Counter = Counter::new("luna.chat.exchanges");
pub(crate) static EXCHANGE_FAILURES: Counter = Counter::new("luna.chat.exchange_failures");
pub(crate) static EXCHANGE_DURATION: Moments = Moments::new("luna.chat.exchange_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_RECORDS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&IDENTITY_REQUESTS);
    collector.register_counter(&IDENTITY_FAILURES);

    collector.register_counter(&EXCHANGES);
    collector.register_counter(&EXCHANGE_FAILURES);
    collector.register_moments(&EXCHANGE_DURATION);
}
