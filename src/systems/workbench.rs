//! # Workbench
//!
//! A board's pin bus together with the parts wired to it. The workbench owns
//! the frame schedule every part relies on:
//!
//! 1. `pre_process` on every part, in insertion order
//! 2. `jump_steps` CPU steps, each followed by `process` on every part
//! 3. `post_process` on every part
//! 4. redraw of every output whose update flag is set
//!
//! The CPU itself is not modelled here; callers hand in a step callback that
//! reads and drives the board pins.

use tracing::{debug, info, trace, warn};

use crate::bus::{PinAccess, PinBus};
use crate::component::Part;
use crate::devices::RxBuffer;
use crate::draw::Canvas;
use crate::remote::{Direction, RemoteControlTable};
use crate::types::{IoId, Timing};

const REDRAW_PASSES: usize = 2;

/// Counters for one `run_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub steps: u32,
    pub outputs_drawn: usize,
}

pub struct Workbench {
    name: String,
    description: String,
    bus: PinBus,
    timing: Timing,
    parts: Vec<Box<dyn Part>>,
    remote: RemoteControlTable,
    rx: RxBuffer,
    frames: u64,
}

impl Workbench {
    pub fn new(name: String, bus: PinBus, timing: Timing) -> Self {
        Workbench {
            name,
            description: String::new(),
            bus,
            timing,
            parts: Vec::new(),
            remote: RemoteControlTable::new(),
            rx: RxBuffer::default(),
            frames: 0,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = description;
        self
    }

    pub fn with_rx_buffer(mut self, rx: RxBuffer) -> Self {
        self.rx = rx;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn bus(&self) -> &PinBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut PinBus {
        &mut self.bus
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    pub fn rx(&self) -> &RxBuffer {
        &self.rx
    }

    pub fn rx_mut(&mut self) -> &mut RxBuffer {
        &mut self.rx
    }

    pub fn remote(&self) -> &RemoteControlTable {
        &self.remote
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn parts(&self) -> impl Iterator<Item = &dyn Part> {
        self.parts.iter().map(|part| part.as_ref())
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> Option<&dyn Part> {
        self.parts.get(index).map(|part| part.as_ref())
    }

    pub fn part_mut(&mut self, index: usize) -> Option<&mut (dyn Part + 'static)> {
        self.parts.get_mut(index).map(|part| part.as_mut())
    }

    pub fn find_part(&self, name: &str) -> Option<usize> {
        self.parts.iter().position(|part| part.name() == name)
    }

    /// Append a part. Parts are scheduled in the order they were added.
    pub fn add_part(&mut self, part: Box<dyn Part>) -> usize {
        let index = self.parts.len();
        if self.find_part(part.name()).is_some() {
            warn!("duplicate part name '{}' on bench {}", part.name(), self.name);
        }
        self.remote
            .register(index, part.name(), Direction::Input, &part.input_table());
        self.remote
            .register(index, part.name(), Direction::Output, &part.output_table());
        info!("added {} '{}' as part {}", part.kind(), part.name(), index);
        self.parts.push(part);
        index
    }

    /// Remove a part and release the bus pins it registered.
    pub fn remove_part(&mut self, index: usize) -> Option<Box<dyn Part>> {
        if index >= self.parts.len() {
            return None;
        }
        let mut part = self.parts.remove(index);
        part.detach(&mut self.bus);
        self.rebuild_remote();
        debug!("removed part '{}'", part.name());
        Some(part)
    }

    fn rebuild_remote(&mut self) {
        self.remote = RemoteControlTable::new();
        for (index, part) in self.parts.iter().enumerate() {
            self.remote
                .register(index, part.name(), Direction::Input, &part.input_table());
            self.remote
                .register(index, part.name(), Direction::Output, &part.output_table());
        }
    }

    pub fn reset(&mut self) {
        for part in self.parts.iter_mut() {
            part.reset(&mut self.bus);
        }
        self.rx.clear();
        self.frames = 0;
        debug!("bench {} reset", self.name);
    }

    /// Run one frame and redraw into `canvas`.
    pub fn run_frame<F>(&mut self, canvas: &mut dyn Canvas, mut cpu_step: F) -> FrameReport
    where
        F: FnMut(&mut dyn PinAccess),
    {
        let timing = self.timing;

        for part in self.parts.iter_mut() {
            part.pre_process(&mut self.bus, &timing);
        }

        for _ in 0..timing.jump_steps {
            cpu_step(&mut self.bus);
            for part in self.parts.iter_mut() {
                part.process(&mut self.bus);
            }
        }

        for part in self.parts.iter_mut() {
            part.post_process(&mut self.bus);
        }

        let outputs_drawn = self.redraw(canvas);
        self.frames += 1;
        trace!(
            "frame {} done: {} steps, {} outputs drawn",
            self.frames,
            timing.jump_steps,
            outputs_drawn
        );

        FrameReport {
            steps: timing.jump_steps,
            outputs_drawn,
        }
    }

    /// Draw every flagged output. Each pass takes the flagged ids, clears
    /// them and draws them in id order; flags raised while drawing are
    /// picked up by the following pass.
    pub fn redraw(&mut self, canvas: &mut dyn Canvas) -> usize {
        let mut drawn = 0;

        for pass in 0..REDRAW_PASSES {
            let mut pass_drawn = 0;
            for part in self.parts.iter_mut() {
                let always = pass == 0 && part.always_update();
                let flagged: Vec<usize> = part
                    .outputs_mut()
                    .iter_mut()
                    .enumerate()
                    .filter_map(|(id, out)| {
                        let draw = out.update || always;
                        out.update = false;
                        draw.then_some(id)
                    })
                    .collect();

                for id in flagged {
                    part.draw_output(IoId::new(id as u16), &self.bus, canvas);
                    pass_drawn += 1;
                }
            }
            drawn += pass_drawn;
            if pass_drawn == 0 {
                break;
            }
        }

        drawn
    }

    /// Forward a keyboard key to every part.
    pub fn key_press(&mut self, key: char) {
        for part in self.parts.iter_mut() {
            part.on_key_press(key);
        }
    }

    pub fn key_release(&mut self, key: char) {
        for part in self.parts.iter_mut() {
            part.on_key_release(key);
        }
    }

    /// Remote write of a part input, by `"<part>.<input>"` name.
    pub fn set_remote_input(&mut self, name: &str, value: u8) -> bool {
        match self.remote.resolve(Direction::Input, name) {
            Some(binding) => self
                .parts
                .get_mut(binding.part)
                .map_or(false, |part| part.set_input_status(binding.id, value)),
            None => {
                warn!("unknown remote input {}", name);
                false
            }
        }
    }

    pub fn remote_input(&self, name: &str) -> Option<u8> {
        let binding = self.remote.resolve(Direction::Input, name)?;
        self.parts.get(binding.part)?.input_status(binding.id)
    }

    pub fn remote_output(&self, name: &str) -> Option<u8> {
        let binding = self.remote.resolve(Direction::Output, name)?;
        self.parts.get(binding.part)?.output_status(binding.id)
    }

    /// One preference record per part, in insertion order.
    pub fn save_preferences(&self) -> Vec<String> {
        self.parts.iter().map(|part| part.write_preferences()).collect()
    }

    /// Load records produced by `save_preferences`. Extra records are
    /// ignored and parts without a record keep their settings.
    pub fn load_preferences<S: AsRef<str>>(&mut self, records: &[S]) {
        if records.len() != self.parts.len() {
            debug!(
                "{} preference records for {} parts",
                records.len(),
                self.parts.len()
            );
        }
        for (part, record) in self.parts.iter_mut().zip(records) {
            part.read_preferences(record.as_ref(), &mut self.bus);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{OutputState, PartKind};
    use crate::components::{HpDisplayLatch, Lm35};
    use crate::draw::{CanvasCmd, OutputArea};
    use crate::remote::IdTable;
    use crate::types::PinIndex;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        log: Log,
        outputs: Vec<OutputState>,
    }

    impl Recorder {
        fn new(name: &str, log: &Log) -> Box<Self> {
            Box::new(Recorder {
                name: name.to_string(),
                log: Rc::clone(log),
                outputs: vec![OutputState::new(OutputArea::default())],
            })
        }

        fn note(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}.{}", self.name, what));
        }
    }

    impl Part for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn kind(&self) -> PartKind {
            PartKind::Lm35
        }
        fn pin_count(&self) -> usize {
            0
        }
        fn pins(&self) -> Vec<PinIndex> {
            Vec::new()
        }
        fn picture_file(&self) -> &'static str {
            ""
        }
        fn map_file(&self) -> &'static str {
            ""
        }
        fn pre_process(&mut self, _bus: &mut dyn PinAccess, _timing: &Timing) {
            self.note("pre");
        }
        fn process(&mut self, _bus: &mut dyn PinAccess) {
            self.note("process");
        }
        fn post_process(&mut self, _bus: &mut dyn PinAccess) {
            self.note("post");
        }
        fn outputs(&self) -> &[OutputState] {
            &self.outputs
        }
        fn outputs_mut(&mut self) -> &mut [OutputState] {
            &mut self.outputs
        }
        fn draw_output(&mut self, _id: IoId, _bus: &dyn PinAccess, _canvas: &mut dyn Canvas) {
            self.note("draw");
        }
        fn write_preferences(&self) -> String {
            String::new()
        }
        fn read_preferences(&mut self, _record: &str, _bus: &mut dyn PinAccess) {}
        fn output_table(&self) -> IdTable {
            IdTable::EMPTY
        }
    }

    fn bench() -> Workbench {
        Workbench::new("test".to_string(), PinBus::new(8), Timing::new(2, 4))
    }

    #[test]
    fn test_frame_phase_order() {
        let log: Log = Rc::default();
        let mut bench = bench();
        bench.add_part(Recorder::new("a", &log));
        bench.add_part(Recorder::new("b", &log));

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        let cpu_log = Rc::clone(&log);
        let report = bench.run_frame(&mut canvas, |_bus| cpu_log.borrow_mut().push("cpu".to_string()));

        let expected = [
            "a.pre", "b.pre", "cpu", "a.process", "b.process", "cpu", "a.process", "b.process",
            "a.post", "b.post", "a.draw", "b.draw",
        ];
        assert_eq!(*log.borrow(), expected);
        assert_eq!(report, FrameReport { steps: 2, outputs_drawn: 2 });
        assert_eq!(bench.frames(), 1);
    }

    #[test]
    fn test_redraw_only_flagged_outputs() {
        let log: Log = Rc::default();
        let mut bench = bench();
        bench.add_part(Recorder::new("a", &log));

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        assert_eq!(bench.redraw(&mut canvas), 1);
        assert_eq!(bench.redraw(&mut canvas), 0);

        if let Some(part) = bench.part_mut(0) {
            part.outputs_mut()[0].update = true;
        }
        assert_eq!(bench.redraw(&mut canvas), 1);
    }

    #[test]
    fn test_always_update_parts_redraw_every_frame() {
        let mut bench = bench();
        let latch = HpDisplayLatch::new("latch".to_string(), bench.bus_mut());
        bench.add_part(Box::new(latch));

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        assert_eq!(bench.redraw(&mut canvas), 34);
        assert_eq!(bench.redraw(&mut canvas), 34);
    }

    #[test]
    fn test_cpu_step_sees_bus() {
        let mut bench = bench();
        let mut sensor = Lm35::new("lm35".to_string());
        sensor.set_output_pin(PinIndex::new(3));
        bench.add_part(Box::new(sensor));

        let mut canvas: Vec<CanvasCmd> = Vec::new();
        bench.run_frame(&mut canvas, |bus| bus.set_pin(PinIndex::new(1), crate::PinValue::High));
        assert_eq!(bench.bus().pin_value(PinIndex::new(1)), crate::PinValue::High);
        assert!((bench.bus().pin_analog(PinIndex::new(3)) - 1.50).abs() < 1e-4);
    }

    #[test]
    fn test_remote_control_by_name() {
        let mut bench = bench();
        bench.add_part(Box::new(Lm35::new("lm35".to_string())));

        assert!(bench.set_remote_input("lm35.PO_1", 50));
        assert_eq!(bench.remote_input("lm35.PO_1"), Some(50));
        assert_eq!(bench.remote_output("lm35.PN_1"), Some(0));
        assert!(!bench.set_remote_input("lm35.PN_1", 1));
        assert!(!bench.set_remote_input("nobody.PO_1", 1));
        assert_eq!(bench.remote_input("nobody.PO_1"), None);
    }

    #[test]
    fn test_preferences_round_trip() {
        let mut bench = bench();
        bench.add_part(Box::new(Lm35::new("t1".to_string())));
        bench.add_part(Box::new(Lm35::new("t2".to_string())));
        bench.load_preferences(&["1,10", "2,20"]);
        let saved = bench.save_preferences();
        assert_eq!(saved, vec!["1,10".to_string(), "2,20".to_string()]);

        bench.load_preferences(&["3,30"]);
        assert_eq!(bench.save_preferences(), vec!["3,30".to_string(), "2,20".to_string()]);
    }

    #[test]
    fn test_remove_part_releases_pins() {
        let mut bench = bench();
        bench.add_part(Box::new(Lm35::new("lm35".to_string())));
        let latch = HpDisplayLatch::new("latch".to_string(), bench.bus_mut());
        let index = bench.add_part(Box::new(latch));
        assert_eq!(bench.bus().pin_count(), 8 + 23);

        let removed = bench.remove_part(index);
        assert_eq!(removed.map(|p| p.name().to_string()), Some("latch".to_string()));
        assert_eq!(bench.bus().pin_count(), 8);
        assert_eq!(bench.remote_output("latch.IC_20"), None);
        assert_eq!(bench.find_part("lm35"), Some(0));
        assert!(bench.remove_part(5).is_none());
    }
}
