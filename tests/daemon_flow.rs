//! Clock → bus → expiry extension → `bundle-expired`, wired through the supervisor.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dtn_core::{
    BundleId, Clock, ClockConfig, ClockQuality, Config, DtnTime, Event, EventBus, Execution,
    ExpiryExtension, ManualClock, MetaBundle, Subscribe, SubscriberError, Supervisor, TimeSource,
    names,
};

#[derive(Default)]
struct Journal(Mutex<Vec<String>>);

impl Journal {
    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscribe for Journal {
    async fn on_event(&self, e: &Event) -> Result<(), SubscriberError> {
        let line = match e.payload::<BundleId>() {
            Some(id) => format!("{}:{}", e.name(), id.sequence),
            None => e.name().to_string(),
        };
        self.0.lock().unwrap().push(line);
        Ok(())
    }
}

struct Elapsed {
    start: tokio::time::Instant,
    base: u64,
}

impl TimeSource for Elapsed {
    fn now(&self) -> DtnTime {
        DtnTime::from_secs(self.base + self.start.elapsed().as_secs())
    }

    fn quality(&self) -> ClockQuality {
        ClockQuality::TRUSTED
    }
}

fn bundle(seq: u64, created: u64, lifetime: u64) -> MetaBundle {
    MetaBundle::new(BundleId::new("dtn://peer/inbox", DtnTime::from_secs(created), seq), lifetime)
}

async fn wait_until_attached(bus: &EventBus) {
    while bus.subscriber_count(names::TIME_TICK) == 0 {
        tokio::task::yield_now().await;
    }
}

async fn flush(bus: &EventBus) {
    bus.publish_and_wait(Event::new("flush")).await.unwrap();
}

#[tokio::test]
async fn host_driven_tick_expires_bundles() {
    let cfg = Config {
        clock: ClockConfig {
            execution: Execution::HostDriven,
            ..ClockConfig::default()
        },
        ..Config::default()
    };
    let bus = EventBus::new(&cfg.bus);
    let journal = Arc::new(Journal::default());
    bus.subscribe(names::BUNDLE_EXPIRED, journal.clone());
    bus.subscribe(names::GLOBAL_SHUTDOWN, journal.clone());

    let time = Arc::new(ManualClock::new(DtnTime::from_secs(1_000)));
    let clock = Arc::new(Clock::new(bus.clone(), time.clone(), &cfg.clock));
    let expiry = Arc::new(ExpiryExtension::new(bus.clone(), time.clone(), &cfg.registry));

    let sup = Supervisor::builder(cfg)
        .with_bus(bus.clone())
        .with_component(clock.clone())
        .with_component(expiry.clone())
        .build()
        .unwrap();

    let driver = async {
        wait_until_attached(&bus).await;

        for (seq, lifetime) in [(1, 100), (2, 50), (3, 150)] {
            bus.publish_and_wait(Event::new(names::BUNDLE_RECEIVED).with_payload(bundle(seq, 1_000, lifetime)))
                .await
                .unwrap();
        }
        assert_eq!(expiry.known(), 3);

        time.set(DtnTime::from_secs(1_120));
        assert!(clock.tick());
        flush(&bus).await;

        assert_eq!(journal.entries(), vec!["bundle-expired:2", "bundle-expired:1"]);
        assert_eq!(expiry.known(), 1);
        assert!(expiry.summary().might_contain(&bundle(3, 1_000, 150).id));

        sup.shutdown();
    };

    let (res, ()) = futures::join!(sup.run(), driver);
    res.unwrap();

    assert_eq!(journal.entries().last().map(String::as_str), Some("global-shutdown"));
    assert!(!bus.is_running());
    assert_eq!(clock.sync().await, Err(dtn_core::ClockError::Aborted));
}

#[tokio::test(start_paused = true)]
async fn self_driven_clock_expires_on_its_own() {
    let cfg = Config::default();
    let bus = EventBus::new(&cfg.bus);
    let journal = Arc::new(Journal::default());
    bus.subscribe(names::BUNDLE_EXPIRED, journal.clone());

    let time: Arc<dyn TimeSource> = Arc::new(Elapsed {
        start: tokio::time::Instant::now(),
        base: 5_000,
    });
    let clock = Arc::new(Clock::new(bus.clone(), Arc::clone(&time), &cfg.clock));
    let expiry = Arc::new(ExpiryExtension::new(bus.clone(), time, &cfg.registry));

    let sup = Supervisor::builder(cfg)
        .with_bus(bus.clone())
        .with_component(clock.clone())
        .with_component(expiry.clone())
        .build()
        .unwrap();

    let driver = async {
        wait_until_attached(&bus).await;
        expiry.track(&bundle(1, 5_000, 2));
        expiry.track(&bundle(2, 5_000, 60));

        // Expiry at 5002 is evicted by the first tick strictly after it.
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        flush(&bus).await;

        assert!(clock.tick_count() >= 3);
        assert_eq!(journal.entries(), vec!["bundle-expired:1"]);
        assert_eq!(expiry.known(), 1);

        sup.shutdown();
    };

    let (res, ()) = futures::join!(sup.run(), driver);
    res.unwrap();
    assert!(clock.is_stopped());
}
