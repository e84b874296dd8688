use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatline.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatline.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatline.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatline.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatline.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatline.stream.bytes");

pub(crate) static SESSION_TURNS: Counter = Counter::new("chatline.session.turns");
pub(crate) static SESSION_STREAMED_TURNS: Counter =
    Counter::new("chatline.session.streamed_turns");
pub(crate) static SESSION_INTERRUPTS: Counter = Counter::new("chatline.session.interrupts");
pub(crate) static SESSION_TIMEOUTS: Counter = Counter::new("chatline.session.timeouts");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("chatline.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_STREAMED_TURNS);
    collector.register_counter(&SESSION_INTERRUPTS);
    collector.register_counter(&SESSION_TIMEOUTS);
    collector.register_moments(&SESSION_TURN_DURATION);
}
