//! Event dispatcher: maps one inbound event to at most one reply.
//!
//! Text messages go through a fixed keyword switch (greeting, omikuji, room sensor) and
//! fall back to echo. Postbacks switch on their data code. Time and randomness are
//! injected through [`Clock`] and [`Draw`] so the handlers stay deterministic under test.

mod clock;
mod draw;

pub use clock::{Clock, SystemClock};
pub use draw::{Draw, ThreadRngDraw};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::channels::InboundEvent;
use crate::config::Config;
use crate::reply::OutboundReply;
use crate::sensor::{SensorClient, SensorSource};

pub const GREETING_EVENING: &str = "こんばんは！";
pub const GREETING_DAYTIME: &str = "こんにちは！";
pub const GREETING_MORNING: &str = "おはよう！";

pub const POSTBACK_YES: &str = "イイね！";
pub const POSTBACK_NO: &str = "つらたん";
pub const POSTBACK_UNKNOWN: &str = "?";

pub const SENSOR_UNREACHABLE: &str = "センサーに接続できていません";

pub const OMIKUJI_DAIKICHI: &str =
    "https://3.bp.blogspot.com/-vQSPQf-ytsc/T3K7QM3qaQI/AAAAAAAAE-s/6SB2q7ltxwg/s1600/omikuji_daikichi.png";
pub const OMIKUJI_KICHI: &str =
    "https://2.bp.blogspot.com/-27IG0CNV-ZE/VKYfn_1-ycI/AAAAAAAAqXw/fr6Y72lOP9s/s400/omikuji_kichi.png";
pub const OMIKUJI_KYOU: &str =
    "https://4.bp.blogspot.com/-qCfF4H7YOvE/T3K7R5ZjQVI/AAAAAAAAE-4/Hd1u2tzMG3Q/s1600/omikuji_kyou.png";

const KEYWORD_GREET: &str = "やあ";
const KEYWORD_OMIKUJI: &str = "おみくじ";
const KEYWORD_ROOM: &str = "部屋";

/// Greeting for an hour of day. Lower bounds are inclusive: 17 is evening, 11 is daytime.
pub fn greeting_for_hour(hour: u32) -> &'static str {
    if hour >= 17 {
        GREETING_EVENING
    } else if hour >= 11 {
        GREETING_DAYTIME
    } else {
        GREETING_MORNING
    }
}

/// Image URL for an omikuji draw. Anything outside 1..=2 is kyou.
pub fn omikuji_url(draw: u32) -> &'static str {
    match draw {
        2 => OMIKUJI_DAIKICHI,
        1 => OMIKUJI_KICHI,
        _ => OMIKUJI_KYOU,
    }
}

/// Render postback params as `{k1=v1, k2=v2}`.
fn render_params(params: &BTreeMap<String, String>) -> String {
    let body = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

/// Stateless dispatcher; clone freely across requests.
#[derive(Clone)]
pub struct Dispatcher {
    clock: Arc<dyn Clock>,
    draw: Arc<dyn Draw>,
    sensor: Arc<dyn SensorSource>,
}

impl Dispatcher {
    pub fn new(clock: Arc<dyn Clock>, draw: Arc<dyn Draw>, sensor: Arc<dyn SensorSource>) -> Self {
        Self {
            clock,
            draw,
            sensor,
        }
    }

    /// Production wiring: local clock, thread RNG, HTTP sensor client.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(ThreadRngDraw),
            Arc::new(SensorClient::from_config(config)),
        )
    }

    /// Route an event to its handler. `Other` events get no reply.
    pub async fn dispatch(&self, event: &InboundEvent) -> Option<OutboundReply> {
        match event {
            InboundEvent::Follow { user_id } => Some(self.on_follow(user_id)),
            InboundEvent::TextMessage { text } => Some(self.on_text_message(text).await),
            InboundEvent::Postback { data, params } => Some(self.on_postback(data, params)),
            InboundEvent::Other { kind } => {
                self.on_unclassified(kind);
                None
            }
        }
    }

    pub fn on_follow(&self, user_id: &str) -> OutboundReply {
        log::info!("follow from user {}", user_id);
        OutboundReply::text(format!("あなたのユーザIDは {}", user_id))
    }

    pub async fn on_text_message(&self, text: &str) -> OutboundReply {
        match text {
            KEYWORD_GREET => self.greet(),
            KEYWORD_OMIKUJI => self.omikuji(),
            KEYWORD_ROOM => self.room_info().await,
            _ => OutboundReply::text(text),
        }
    }

    pub fn on_postback(&self, data: &str, params: &BTreeMap<String, String>) -> OutboundReply {
        match data {
            "CY" => OutboundReply::text(POSTBACK_YES),
            "CN" => OutboundReply::text(POSTBACK_NO),
            "DT" => OutboundReply::text(render_params(params)),
            _ => OutboundReply::text(POSTBACK_UNKNOWN),
        }
    }

    pub fn on_unclassified(&self, kind: &str) {
        log::info!("unhandled event: {}", kind);
    }

    pub fn greet(&self) -> OutboundReply {
        OutboundReply::text(greeting_for_hour(self.clock.hour()))
    }

    pub fn omikuji(&self) -> OutboundReply {
        OutboundReply::image(omikuji_url(self.draw.below(3)))
    }

    /// Sensor failures turn into a fixed reply; nothing is retried or propagated.
    pub async fn room_info(&self) -> OutboundReply {
        match self.sensor.read().await {
            Ok(r) => OutboundReply::text(format!(
                "二酸化炭素は{}ppm、温度は{}度です",
                r.concentration, r.temperature
            )),
            Err(e) => {
                log::error!("room sensor read failed: {}", e);
                OutboundReply::text(SENSOR_UNREACHABLE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{SensorError, SensorReading};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FixedClock(u32);

    impl Clock for FixedClock {
        fn hour(&self) -> u32 {
            self.0
        }
    }

    struct FixedDraw(u32);

    impl Draw for FixedDraw {
        fn below(&self, _upper: u32) -> u32 {
            self.0
        }
    }

    enum FakeSensor {
        Reading(SensorReading),
        ClientError,
    }

    #[async_trait]
    impl SensorSource for FakeSensor {
        async fn read(&self) -> Result<SensorReading, SensorError> {
            match self {
                FakeSensor::Reading(r) => Ok(*r),
                FakeSensor::ClientError => Err(SensorError::Status("404 Not Found".into())),
            }
        }
    }

    fn dispatcher_at(hour: u32, draw: u32, sensor: FakeSensor) -> Dispatcher {
        Dispatcher::new(
            Arc::new(FixedClock(hour)),
            Arc::new(FixedDraw(draw)),
            Arc::new(sensor),
        )
    }

    fn dispatcher() -> Dispatcher {
        dispatcher_at(9, 0, FakeSensor::ClientError)
    }

    #[test]
    fn greeting_boundaries() {
        assert_eq!(greeting_for_hour(23), GREETING_EVENING);
        assert_eq!(greeting_for_hour(17), GREETING_EVENING);
        assert_eq!(greeting_for_hour(16), GREETING_DAYTIME);
        assert_eq!(greeting_for_hour(11), GREETING_DAYTIME);
        assert_eq!(greeting_for_hour(10), GREETING_MORNING);
        assert_eq!(greeting_for_hour(0), GREETING_MORNING);
    }

    #[tokio::test]
    async fn greet_keyword_uses_injected_clock() {
        let d = dispatcher_at(17, 0, FakeSensor::ClientError);
        assert_eq!(d.on_text_message("やあ").await, OutboundReply::text("こんばんは！"));
        let d = dispatcher_at(10, 0, FakeSensor::ClientError);
        assert_eq!(d.on_text_message("やあ").await, OutboundReply::text("おはよう！"));
    }

    #[tokio::test]
    async fn unknown_text_echoes() {
        let d = dispatcher();
        for text in ["hello", "", "やあ ", "おみくじ!", "へや"] {
            assert_eq!(d.on_text_message(text).await, OutboundReply::text(text));
        }
    }

    #[test]
    fn follow_embeds_user_id() {
        match dispatcher().on_follow("U123") {
            OutboundReply::Text { text } => assert!(text.contains("U123")),
            other => panic!("expected text reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn omikuji_maps_each_draw() {
        for (n, url) in [(0, OMIKUJI_KYOU), (1, OMIKUJI_KICHI), (2, OMIKUJI_DAIKICHI)] {
            let d = dispatcher_at(9, n, FakeSensor::ClientError);
            assert_eq!(d.on_text_message("おみくじ").await, OutboundReply::image(url));
        }
        assert_eq!(omikuji_url(7), OMIKUJI_KYOU);
    }

    #[test]
    fn omikuji_with_real_rng_reaches_every_url() {
        let d = Dispatcher::new(
            Arc::new(FixedClock(9)),
            Arc::new(ThreadRngDraw),
            Arc::new(FakeSensor::ClientError),
        );
        let allowed = [OMIKUJI_DAIKICHI, OMIKUJI_KICHI, OMIKUJI_KYOU];
        let mut seen = HashSet::new();
        for _ in 0..500 {
            match d.omikuji() {
                OutboundReply::Image {
                    original_content_url,
                    preview_image_url,
                } => {
                    assert_eq!(original_content_url, preview_image_url);
                    assert!(allowed.contains(&original_content_url.as_str()));
                    seen.insert(original_content_url);
                }
                other => panic!("expected image reply, got {:?}", other),
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn postback_codes() {
        let d = dispatcher();
        let empty = BTreeMap::new();
        assert_eq!(d.on_postback("CY", &empty), OutboundReply::text("イイね！"));
        assert_eq!(d.on_postback("CN", &empty), OutboundReply::text("つらたん"));
        assert_eq!(d.on_postback("XX", &empty), OutboundReply::text("?"));
        assert_eq!(d.on_postback("DT", &empty), OutboundReply::text("{}"));
    }

    #[test]
    fn postback_dt_renders_params_in_key_order() {
        let mut params = BTreeMap::new();
        params.insert("time".to_string(), "10:00".to_string());
        params.insert("date".to_string(), "2017-09-03".to_string());
        assert_eq!(
            dispatcher().on_postback("DT", &params),
            OutboundReply::text("{date=2017-09-03, time=10:00}")
        );
    }

    #[tokio::test]
    async fn room_info_formats_reading() {
        let d = dispatcher_at(
            9,
            0,
            FakeSensor::Reading(SensorReading {
                concentration: 412.0,
                temperature: 23.5,
            }),
        );
        assert_eq!(
            d.on_text_message("部屋").await,
            OutboundReply::text("二酸化炭素は412ppm、温度は23.5度です")
        );
    }

    #[tokio::test]
    async fn room_info_falls_back_on_client_error() {
        let d = dispatcher_at(9, 0, FakeSensor::ClientError);
        assert_eq!(
            d.room_info().await,
            OutboundReply::text("センサーに接続できていません")
        );
    }

    #[tokio::test]
    async fn other_events_get_no_reply() {
        let d = dispatcher();
        let event = InboundEvent::Other {
            kind: "unfollow".into(),
        };
        assert_eq!(d.dispatch(&event).await, None);
    }

    #[tokio::test]
    async fn dispatch_routes_by_event_type() {
        let d = dispatcher_at(12, 0, FakeSensor::ClientError);
        assert_eq!(
            d.dispatch(&InboundEvent::TextMessage { text: "やあ".into() }).await,
            Some(OutboundReply::text("こんにちは！"))
        );
        assert_eq!(
            d.dispatch(&InboundEvent::Postback {
                data: "CN".into(),
                params: BTreeMap::new(),
            })
            .await,
            Some(OutboundReply::text("つらたん"))
        );
        assert_eq!(
            d.dispatch(&InboundEvent::Follow {
                user_id: "U9".into()
            })
            .await,
            Some(OutboundReply::text("あなたのユーザIDは U9"))
        );
    }
}
