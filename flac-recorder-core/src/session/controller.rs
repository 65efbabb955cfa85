use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::traits::control_surface::{Button, Control, ControlSurface};

/// Intent shared between the control thread and the capture thread.
///
/// `on` is written by the control thread and read by the capture thread.
/// `stop` is written once, on shutdown.
#[derive(Debug, Default)]
pub struct IntentFlags {
    on: AtomicBool,
    stop: AtomicBool,
}

impl IntentFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    /// Flip `on` and return the new value.
    pub fn toggle(&self) -> bool {
        !self.on.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

struct BlinkState {
    last_flip: Instant,
    lit: bool,
}

/// Record on/off state machine, driven from the control thread.
///
/// Never touches the device or the encoder: it flips the shared intent and
/// keeps the Record indicator in sync, blinking while recording.
pub struct RecordingController {
    flags: Arc<IntentFlags>,
    surface: Arc<dyn ControlSurface>,
    blink: Mutex<BlinkState>,
    blink_interval: Duration,
}

impl RecordingController {
    pub fn new(flags: Arc<IntentFlags>, surface: Arc<dyn ControlSurface>, blink_interval: Duration) -> Self {
        Self {
            flags,
            surface,
            blink: Mutex::new(BlinkState {
                last_flip: Instant::now(),
                lit: false,
            }),
            blink_interval,
        }
    }

    pub fn is_on(&self) -> bool {
        self.flags.is_on()
    }

    /// Start or stop recording. Returns whether recording is now wanted.
    pub fn toggle(&self) -> bool {
        let on = self.flags.toggle();
        {
            let mut blink = self.blink.lock();
            blink.lit = on;
            blink.last_flip = Instant::now();
        }
        log::info!("Recording {}", if on { "requested" } else { "stop requested" });
        self.send(Control::switch(Button::Record, on));
        on
    }

    pub fn poll(&self) {
        self.poll_at(Instant::now());
    }

    /// Blink the Record indicator while recording is wanted.
    pub fn poll_at(&self, now: Instant) {
        if !self.flags.is_on() {
            return;
        }

        let lit = {
            let mut blink = self.blink.lock();
            if now.duration_since(blink.last_flip) < self.blink_interval {
                return;
            }
            blink.lit = !blink.lit;
            blink.last_flip = now;
            blink.lit
        };
        self.send(Control::switch(Button::Record, lit));
    }

    /// Dispatch an incoming control. Releasing Record toggles recording.
    pub fn handle_control(&self, control: Control) -> Option<Button> {
        let button = Button::from_param(control.param);
        match button {
            Some(Button::Record) if control.is_release() => {
                self.toggle();
            }
            Some(other) => log::debug!("Ignoring {:?} ({})", other, control.value),
            None => log::debug!("Ignoring unknown control {}", control.param),
        }
        button
    }

    fn send(&self, control: Control) {
        log::debug!("Indicator {} -> {}", control.param, control.value);
        self.surface.send_control(control);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct SurfaceLog(Mutex<Vec<Control>>);

    impl ControlSurface for SurfaceLog {
        fn send_control(&self, control: Control) {
            self.0.lock().push(control);
        }
    }

    fn controller() -> (RecordingController, Arc<IntentFlags>, Arc<SurfaceLog>) {
        let flags = Arc::new(IntentFlags::new());
        let surface = Arc::new(SurfaceLog::default());
        let controller = RecordingController::new(flags.clone(), surface.clone(), Duration::from_millis(200));
        (controller, flags, surface)
    }

    fn record(on: bool) -> Control {
        Control::switch(Button::Record, on)
    }

    #[test]
    fn toggle_flips_intent_and_indicator() {
        let (controller, flags, surface) = controller();

        assert!(controller.toggle());
        assert!(flags.is_on());
        assert!(!controller.toggle());
        assert!(!flags.is_on());

        assert_eq!(*surface.0.lock(), vec![record(true), record(false)]);
    }

    #[test]
    fn poll_blinks_every_interval_while_on() {
        let (controller, _, surface) = controller();
        controller.toggle();
        let start = controller.blink.lock().last_flip;

        controller.poll_at(start + Duration::from_millis(100));
        assert_eq!(surface.0.lock().len(), 1);

        controller.poll_at(start + Duration::from_millis(200));
        controller.poll_at(start + Duration::from_millis(250));
        controller.poll_at(start + Duration::from_millis(400));

        assert_eq!(*surface.0.lock(), vec![record(true), record(false), record(true)]);
    }

    #[test]
    fn poll_is_quiet_when_off() {
        let (controller, _, surface) = controller();
        controller.poll_at(Instant::now() + Duration::from_secs(5));
        assert!(surface.0.lock().is_empty());
    }

    #[test]
    fn record_release_toggles() {
        let (controller, flags, _) = controller();

        assert_eq!(controller.handle_control(Control::new(107, 0x7f)), Some(Button::Record));
        assert!(!flags.is_on());
        controller.handle_control(Control::new(107, 0));
        assert!(flags.is_on());
    }

    #[test]
    fn other_controls_are_ignored() {
        let (controller, flags, surface) = controller();

        assert_eq!(controller.handle_control(Control::new(109, 0)), Some(Button::Play));
        assert_eq!(controller.handle_control(Control::new(1, 0)), None);
        assert!(!flags.is_on());
        assert!(surface.0.lock().is_empty());
    }

    #[test]
    fn stop_flag_is_sticky() {
        let flags = IntentFlags::new();
        assert!(!flags.stop_requested());
        flags.request_stop();
        flags.toggle();
        assert!(flags.stop_requested());
    }
}
