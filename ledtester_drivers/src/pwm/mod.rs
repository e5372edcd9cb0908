use hal::{
    clocks::Clocks,
    pac::TIM2,
    timer::{
        Alignment, CaptureCompareDma, CountDir, OutputCompare, TimChannel, Timer, TimerConfig,
        UpdateReqSrc,
    },
};

use ledtester_algo::config::LED_NUM;
use ledtester_algo::ports::DutyOutput;

use super::pinout;

const CHANNELS: [TimChannel; LED_NUM] = [
    TimChannel::C1,
    TimChannel::C2,
    TimChannel::C3,
    TimChannel::C4,
];

/// Four LED current sources driven by TIM2 in edge-aligned PWM
pub struct LedPwm {
    tim: Timer<TIM2>,
}

impl LedPwm {
    pub fn new(tim2: TIM2, clock_cfg: &Clocks, freq: u16) -> Self {
        let mut timer = Timer::new_tim2(
            tim2,
            freq as f32,
            TimerConfig {
                one_pulse_mode: false,
                update_request_source: UpdateReqSrc::Any,
                auto_reload_preload: true,
                alignment: Alignment::Edge,
                capture_compare_dma: CaptureCompareDma::Update,
                direction: CountDir::Up,
            },
            clock_cfg,
        );
        timer.enable();

        LedPwm { tim: timer }
    }

    /// Enable the outputs with every duty at 0 and hand the pins to the timer.
    pub fn begin(&mut self) {
        for ch in CHANNELS {
            self.tim.enable_pwm_output(ch, OutputCompare::Pwm1, 0.0);
        }

        pinout::led::LED0.init();
        pinout::led::LED1.init();
        pinout::led::LED2.init();
        pinout::led::LED3.init();
    }

    // Duty is expressed over a 16-bit period
    fn duty2period(duty: u16, period: u32) -> u32 {
        (duty as u32 * period) >> 16
    }
}

impl DutyOutput for LedPwm {
    fn set_duty(&mut self, channel: usize, duty: u16) {
        let period = self.tim.get_max_duty();
        self.tim
            .set_duty(CHANNELS[channel], Self::duty2period(duty, period));
    }
}
