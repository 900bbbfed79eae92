use std::rc::Rc;

use htn_worldstate::WorldStateView;

/// Recurring world-state maintenance that runs alongside latent tasks
/// for as long as its part of the plan is executing.
pub trait PlanService {
    fn name(&self) -> &str;

    fn on_begin(&self, view: &mut WorldStateView) {
        let _ = view;
    }

    fn on_tick(&self, view: &mut WorldStateView);

    fn on_end(&self, view: &mut WorldStateView) {
        let _ = view;
    }
}

/// Tick cadence in seconds, with a uniform random deviation applied to
/// every interval so services started together spread apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSchedule {
    pub interval: f32,
    pub random_deviation: f32,
}

impl ServiceSchedule {
    pub fn every(interval: f32) -> Self {
        Self {
            interval,
            random_deviation: 0.0,
        }
    }

    pub fn with_deviation(interval: f32, random_deviation: f32) -> Self {
        Self {
            interval,
            random_deviation,
        }
    }

    fn next_interval(&self) -> f32 {
        (self.interval + jitter(self.random_deviation)).max(0.0)
    }
}

struct ServiceEntry {
    service: Rc<dyn PlanService>,
    schedule: ServiceSchedule,
    remaining: f32,
}

/// Drives the registered services' begin/tick/end hooks against the
/// agent's live view.
#[derive(Default)]
pub struct ServiceScheduler {
    entries: Vec<ServiceEntry>,
    began: bool,
}

impl ServiceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, service: Rc<dyn PlanService>, schedule: ServiceSchedule) {
        self.entries.push(ServiceEntry {
            service,
            schedule,
            remaining: schedule.next_interval(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn begin(&mut self, view: &mut WorldStateView) {
        if self.began {
            return;
        }
        self.began = true;
        for entry in &mut self.entries {
            log::debug!("service '{}' begins", entry.service.name());
            entry.service.on_begin(view);
            entry.remaining = entry.schedule.next_interval();
        }
    }

    /// Advances all deadlines by `dt`, ticking every service that came
    /// due and rescheduling it with fresh jitter.
    pub fn advance(&mut self, dt: f32, view: &mut WorldStateView) {
        if !self.began {
            return;
        }
        for entry in &mut self.entries {
            entry.remaining -= dt;
            if entry.remaining <= 0.0 {
                entry.service.on_tick(view);
                entry.remaining = entry.schedule.next_interval();
            }
        }
    }

    pub fn end(&mut self, view: &mut WorldStateView) {
        if !self.began {
            return;
        }
        self.began = false;
        for entry in &mut self.entries {
            log::debug!("service '{}' ends", entry.service.name());
            entry.service.on_end(view);
        }
    }
}

/// Uniform sample in `[-deviation, +deviation]`; zero when no deviation
/// was asked for or entropy is unavailable.
fn jitter(deviation: f32) -> f32 {
    if deviation <= 0.0 {
        return 0.0;
    }
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        return 0.0;
    }
    let unit = u32::from_le_bytes(buf) as f32 / u32::MAX as f32;
    (unit * 2.0 - 1.0) * deviation
}
