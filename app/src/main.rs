#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use hal::{
    self,
    clocks::Clocks,
    pac,
    pac::TIM3,
    timer::{Timer, TimerInterrupt},
};

use ledtester_algo::{
    config::{EngineConfig, LED_NUM},
    Acquisition, Engine,
};

const PWM_FREQ: u16 = 732; // 16-bit period at 48 MHz

#[rtic::app(device = pac, peripherals = true, dispatchers = [TIM7])]
mod app {
    use super::*;

    use ledtester_drivers::*;

    #[shared]
    struct Shared {
        engine: Engine,
        front_end: analog::AdcFrontEnd,
        led_pwm: pwm::LedPwm,
    }

    #[local]
    struct Local {
        ctrl_timer: Timer<TIM3>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", clock_cfg.sysclk() / 1000000);

        let mut led_pwm = pwm::LedPwm::new(dp.TIM2, &clock_cfg, PWM_FREQ);
        led_pwm.begin();

        let mut front_end = analog::AdcFrontEnd::new(dp.ADC1, dp.DMA1, &clock_cfg);

        let config = EngineConfig::default();
        // Every goal starts at 0: outputs idle until the operator sets them
        let mut engine = Engine::new(config);
        engine.calibrate(&mut front_end, &mut led_pwm);

        let ctrl_freq = 1000. / config.ctrl_period_ms as f32;
        let mut ctrl_timer = Timer::new_tim3(dp.TIM3, ctrl_freq, Default::default(), &clock_cfg);
        ctrl_timer.enable_interrupt(TimerInterrupt::Update);
        ctrl_timer.enable();

        (
            Shared {
                engine,
                front_end,
                led_pwm,
            },
            Local { ctrl_timer },
        )
    }

    #[task(binds = TIM3, local = [ctrl_timer], shared = [engine, front_end], priority = 2)]
    fn on_ctrl_tick(cx: on_ctrl_tick::Context) {
        cx.local.ctrl_timer.clear_interrupt(TimerInterrupt::Update);

        let outcome = (cx.shared.engine, cx.shared.front_end)
            .lock(|engine, front_end| engine.on_tick(front_end));

        if let Acquisition::Started { channel, path } = outcome.acquisition {
            defmt::trace!("ch{}: acquiring on {}", channel, path);
        }
        if outcome.ui_tick {
            ui_tick::spawn().ok();
        }
    }

    #[task(binds = DMA1_CH1, shared = [engine, front_end, led_pwm], priority = 2)]
    fn on_batch_read(cx: on_batch_read::Context) {
        (cx.shared.engine, cx.shared.front_end, cx.shared.led_pwm).lock(
            |engine, front_end, led_pwm| {
                let batch = front_end.finish_batch();
                engine.on_batch_complete(&batch, led_pwm);
            },
        );
    }

    /// UI-rate task: reports the per-channel diagnostics.
    #[task(priority = 1, shared = [engine])]
    async fn ui_tick(mut cx: ui_tick::Context) {
        cx.shared.engine.lock(|engine| {
            for ch in 0..LED_NUM {
                defmt::debug!(
                    "ch{}: goal={}uA meas={}uA code={} gain={} duty={} fixed={}",
                    ch,
                    engine.goal_current(ch),
                    engine.measured_current(ch),
                    engine.last_raw_code(ch),
                    engine.last_gain(ch),
                    engine.duty(ch),
                    engine.is_fixed(ch)
                );
            }
            if engine.overruns() > 0 {
                defmt::warn!("{} control ticks overran", engine.overruns());
            }
        });
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
