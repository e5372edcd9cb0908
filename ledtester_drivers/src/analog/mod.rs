// Converter front end of the tester.
//
// Key Features:
// - Multiplexer select lines and the settling wait after a channel change
// - Blocking single conversions on a gain path or the internal reference
// - Batch of BATCH_LEN conversions on one path, transferred by DMA1 channel 1
// - Codes normalised to 10 bits
//
// Detailed Operation:
// The converter runs right-aligned at 12 bits in continuous mode. A single
// read converts once and stops. A batch points DMA at a static buffer and
// lets the converter run until the transfer completes; the completion
// interrupt calls `finish_batch`, which stops both and returns the codes.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::{
    adc::{Adc, AdcConfig, AdcDevice, Align, InputType, OperationMode, SampleTime},
    clocks::Clocks,
    dma::{self, Dma, DmaChannel, DmaInput, DmaInterrupt, DmaPeriph},
    gpio::Pin,
    pac::{self, ADC1, DMA1},
};

use ledtester_algo::analog::GainPath;
use ledtester_algo::config::BATCH_LEN;
use ledtester_algo::ports::{AnalogFrontEnd, AnalogInput};

use super::pinout::{self, analog::*};

const NORMALIZE_SHIFT: u8 = 2; // 12-bit -> 10-bit
const SETTLE_US: u32 = 1;

static mut BATCH_BUF: [u16; BATCH_LEN] = [0; BATCH_LEN];

fn path_channel(path: GainPath) -> u8 {
    match path {
        GainPath::HighGain => HIGH_GAIN_CH,
        GainPath::MidGain => MID_GAIN_CH,
        GainPath::DirectSense => DIRECT_SENSE_CH,
    }
}

pub struct AdcFrontEnd {
    adc: Adc<ADC1>,
    dma: Dma<DMA1>,
    sel1: Pin,
    sel2: Pin,
    settle_cycles: u32, // Core cycles of the mux settling wait
}

impl AdcFrontEnd {
    pub fn new(adc1: ADC1, dma1: DMA1, clock_cfg: &Clocks) -> Self {
        pinout::analog::HIGH_GAIN.init();
        pinout::analog::MID_GAIN.init();
        pinout::analog::DIRECT_SENSE.init();
        let sel1 = pinout::mux::SEL1.init();
        let sel2 = pinout::mux::SEL2.init();

        let mut adc = Adc::new_adc1(
            adc1,
            AdcDevice::One,
            AdcConfig {
                operation_mode: OperationMode::Continuous,
                ..Default::default()
            },
            clock_cfg.systick(),
        );

        for ch in [HIGH_GAIN_CH, MID_GAIN_CH, DIRECT_SENSE_CH, VREFINT_CH] {
            adc.set_input_type(ch, InputType::SingleEnded);
            adc.set_sample_time(ch, SampleTime::T2);
        }
        adc.set_align(Align::Right);

        // VREFINT is gated in the common block of ADC1/2
        unsafe {
            (*pac::ADC12_COMMON::ptr())
                .ccr
                .modify(|_, w| w.vrefen().set_bit());
        }

        let mut dma = Dma::new(dma1);
        dma::enable_mux1();
        dma::mux(DmaPeriph::Dma1, DmaChannel::C1, DmaInput::Adc1);
        dma.enable_interrupt(DmaChannel::C1, DmaInterrupt::TransferComplete);

        let mut front_end = AdcFrontEnd {
            adc,
            dma,
            sel1,
            sel2,
            settle_cycles: clock_cfg.sysclk() / 1_000_000 * SETTLE_US,
        };
        front_end.select_channel(0);
        front_end
    }

    fn read_raw(&mut self, ch: u8) -> u16 {
        let code = self.adc.read(ch);
        self.adc.stop_conversions();
        code >> NORMALIZE_SHIFT
    }

    /// Stop the batch after its transfer-complete interrupt and return the
    /// normalised codes.
    pub fn finish_batch(&mut self) -> [u16; BATCH_LEN] {
        dma::clear_interrupt(
            DmaPeriph::Dma1,
            DmaChannel::C1,
            DmaInterrupt::TransferComplete,
        );
        self.dma.stop(DmaChannel::C1);
        self.adc.stop_conversions();

        let buf = unsafe { &*core::ptr::addr_of!(BATCH_BUF) };
        buf.map(|code| code >> NORMALIZE_SHIFT)
    }
}

impl AnalogFrontEnd for AdcFrontEnd {
    fn select_channel(&mut self, channel: usize) {
        if channel & 0b01 != 0 {
            self.sel1.set_high();
        } else {
            self.sel1.set_low();
        }
        if channel & 0b10 != 0 {
            self.sel2.set_high();
        } else {
            self.sel2.set_low();
        }
    }

    fn settle_delay(&mut self) {
        cortex_m::asm::delay(self.settle_cycles);
    }

    fn read_single(&mut self, input: AnalogInput) -> u16 {
        match input {
            AnalogInput::Path(path) => self.read_raw(path_channel(path)),
            AnalogInput::InternalReference => self.read_raw(VREFINT_CH),
        }
    }

    fn start_batch(&mut self, path: GainPath) {
        let seq = [path_channel(path)];
        unsafe {
            self.adc.read_dma(
                &mut *core::ptr::addr_of_mut!(BATCH_BUF),
                &seq,
                DmaChannel::C1,
                Default::default(),
                DmaPeriph::Dma1,
            )
        };
    }
}
