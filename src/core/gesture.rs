//! 隐藏的多次点击手势识别。
//!
//! 在 `tap_window` 时间窗内累计点击，达到 `required_taps` 时触发回调并回到空闲。
//! 时间窗从窗口内第一次点击开始计算；超时后的下一次点击重新从 1 计数。
//! 状态只存在于识别器实例中，不做持久化。

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// 手势配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapGestureConfig {
    /// 触发所需点击次数（默认 5）
    pub required_taps: u32,
    /// 计数时间窗（默认 3000ms）
    pub tap_window: Duration,
    /// 关闭时忽略所有点击
    pub enabled: bool,
}

impl Default for TapGestureConfig {
    fn default() -> Self {
        Self {
            required_taps: 5,
            tap_window: Duration::from_millis(3000),
            enabled: true,
        }
    }
}

impl TapGestureConfig {
    #[must_use]
    pub fn new(required_taps: u32, tap_window: Duration) -> Self {
        Self {
            required_taps,
            tap_window,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// State / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapState {
    Idle,
    Counting(u32),
}

/// 单次点击的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// 识别器已关闭
    Ignored,
    /// 已计数，尚未达到阈值
    Counting(u32),
    /// 达到阈值，回调已执行
    Triggered,
}

impl TapOutcome {
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered)
    }
}

// ---------------------------------------------------------------------------
// Recognizer
// ---------------------------------------------------------------------------

pub struct TapRecognizer {
    config: TapGestureConfig,
    count: u32,
    window_start: Option<Instant>,
    on_trigger: Option<Box<dyn FnMut()>>,
    on_tap: Option<Box<dyn FnMut(u32)>>,
}

impl TapRecognizer {
    pub fn new(config: TapGestureConfig) -> Self {
        Self {
            config,
            count: 0,
            window_start: None,
            on_trigger: None,
            on_tap: None,
        }
    }

    /// 达到阈值时调用
    pub fn on_trigger(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_trigger = Some(Box::new(callback));
        self
    }

    /// 每次计数后调用，参数为当前计数（视觉反馈用）
    pub fn on_tap(mut self, callback: impl FnMut(u32) + 'static) -> Self {
        self.on_tap = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &TapGestureConfig {
        &self.config
    }

    pub fn state(&self) -> TapState {
        if self.count == 0 {
            TapState::Idle
        } else {
            TapState::Counting(self.count)
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// 关闭时同时清空计数
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.window_start = None;
    }

    /// 处理一次点击
    pub fn tap(&mut self, now: Instant) -> TapOutcome {
        if !self.config.enabled {
            return TapOutcome::Ignored;
        }

        match self.window_start {
            Some(start) if now.saturating_duration_since(start) <= self.config.tap_window => {
                self.count += 1;
            }
            _ => {
                self.count = 1;
                self.window_start = Some(now);
            }
        }

        let count = self.count;
        tracing::debug!(count, required = self.config.required_taps, "tap");

        if let Some(on_tap) = self.on_tap.as_mut() {
            on_tap(count);
        }

        if count >= self.config.required_taps.max(1) {
            self.reset();
            if let Some(on_trigger) = self.on_trigger.as_mut() {
                on_trigger();
            }
            return TapOutcome::Triggered;
        }

        TapOutcome::Counting(count)
    }
}

impl std::fmt::Debug for TapRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapRecognizer")
            .field("config", &self.config)
            .field("count", &self.count)
            .field("window_start", &self.window_start)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn counting_recognizer(config: TapGestureConfig) -> (TapRecognizer, Rc<Cell<u32>>) {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let recognizer = TapRecognizer::new(config).on_trigger(move || f.set(f.get() + 1));
        (recognizer, fired)
    }

    #[test]
    fn default_config_values() {
        let config = TapGestureConfig::default();
        assert_eq!(config.required_taps, 5);
        assert_eq!(config.tap_window, ms(3000));
        assert!(config.enabled);
    }

    #[test]
    fn five_taps_within_window_trigger_once() {
        let (mut rec, fired) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();

        for i in 0..4 {
            assert_eq!(rec.tap(t0 + ms(i * 200)), TapOutcome::Counting(i as u32 + 1));
        }
        assert_eq!(rec.tap(t0 + ms(800)), TapOutcome::Triggered);
        assert_eq!(fired.get(), 1);
        assert_eq!(rec.state(), TapState::Idle);
    }

    #[test]
    fn tap_after_trigger_starts_new_window() {
        let (mut rec, fired) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();
        for i in 0..5 {
            rec.tap(t0 + ms(i * 100));
        }
        assert_eq!(rec.tap(t0 + ms(600)), TapOutcome::Counting(1));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn gap_longer_than_window_restarts_count() {
        let (mut rec, fired) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();

        rec.tap(t0);
        rec.tap(t0 + ms(500));
        rec.tap(t0 + ms(1000));
        // 距窗口起点超过 3000ms
        assert_eq!(rec.tap(t0 + ms(3001)), TapOutcome::Counting(1));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn window_is_measured_from_first_tap() {
        let (mut rec, fired) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();

        // 间隔都小于窗口，但总时长超过窗口
        for i in 0..4 {
            rec.tap(t0 + ms(i * 900));
        }
        assert_eq!(rec.state(), TapState::Counting(1));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn tap_exactly_at_window_edge_still_counts() {
        let (mut rec, _) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();
        rec.tap(t0);
        assert_eq!(rec.tap(t0 + ms(3000)), TapOutcome::Counting(2));
    }

    #[test]
    fn disabled_ignores_taps() {
        let mut config = TapGestureConfig::default();
        config.enabled = false;
        let (mut rec, fired) = counting_recognizer(config);
        let t0 = Instant::now();

        for i in 0..10 {
            assert_eq!(rec.tap(t0 + ms(i)), TapOutcome::Ignored);
        }
        assert_eq!(rec.state(), TapState::Idle);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn disabling_resets_state() {
        let (mut rec, _) = counting_recognizer(TapGestureConfig::default());
        let t0 = Instant::now();
        rec.tap(t0);
        rec.tap(t0 + ms(10));
        assert_eq!(rec.state(), TapState::Counting(2));

        rec.set_enabled(false);
        assert_eq!(rec.state(), TapState::Idle);
        rec.set_enabled(true);
        assert_eq!(rec.tap(t0 + ms(20)), TapOutcome::Counting(1));
    }

    #[test]
    fn feedback_hook_sees_each_count() {
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let mut rec = TapRecognizer::new(TapGestureConfig::new(3, ms(1000)))
            .on_tap(move |n| s.borrow_mut().push(n));
        let t0 = Instant::now();
        for i in 0..3 {
            rec.tap(t0 + ms(i * 10));
        }
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn single_tap_threshold() {
        let (mut rec, fired) = counting_recognizer(TapGestureConfig::new(1, ms(100)));
        assert!(rec.tap(Instant::now()).is_triggered());
        assert_eq!(fired.get(), 1);
    }

    proptest! {
        #[test]
        fn n_taps_inside_window_fire_exactly_once(
            required in 1u32..12,
            window_ms in 50u64..5000,
        ) {
            let (mut rec, fired) =
                counting_recognizer(TapGestureConfig::new(required, ms(window_ms)));
            let t0 = Instant::now();
            let step = window_ms / u64::from(required);
            for i in 0..u64::from(required) {
                rec.tap(t0 + ms(i * step));
            }
            prop_assert_eq!(fired.get(), 1);
            prop_assert_eq!(rec.state(), TapState::Idle);
        }

        #[test]
        fn gap_beyond_window_resets_to_one(
            required in 2u32..12,
            window_ms in 50u64..5000,
            before_gap in 1u32..11,
            extra in 1u64..10_000,
        ) {
            let before_gap = before_gap.min(required - 1);
            let (mut rec, fired) =
                counting_recognizer(TapGestureConfig::new(required, ms(window_ms)));
            let t0 = Instant::now();
            for i in 0..u64::from(before_gap) {
                rec.tap(t0 + ms(i));
            }
            let outcome = rec.tap(t0 + ms(window_ms + extra));
            prop_assert_eq!(outcome, TapOutcome::Counting(1));
            prop_assert_eq!(fired.get(), 0);
        }
    }
}
