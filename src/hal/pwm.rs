//! Waveform PWM Driver
//!
//! TIM15 channel 2 on PB15 produces the AFSK square wave for the `Si4032`
//! direct modulation input. The channel runs in toggle mode, so every
//! update flips the pin and the auto-reload value sets half a tone cycle.
//! DMA1 channel 5 (TIM15 update request) rewrites the auto-reload register
//! from a circular buffer.

use embassy_stm32::pac;
use embassy_stm32::pac::bdma::vals as dma_vals;
use embassy_stm32::pac::timer::vals as tim_vals;

use crate::radio::peripheral::WaveformPwm;

/// DMA1 channel 5, zero based
const DMA_CHANNEL: usize = 4;

/// TIM15 channel 2, zero based
const PWM_CHANNEL: usize = 1;

/// DMA interrupt kind, read and cleared in the DMA1 channel 5 handler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmaEvent {
    /// First half of the buffer consumed
    HalfTransfer,
    /// Second half of the buffer consumed
    TransferComplete,
}

impl defmt::Format for DmaEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::HalfTransfer => defmt::write!(f, "HT"),
            Self::TransferComplete => defmt::write!(f, "TC"),
        }
    }
}

/// TIM15 toggle output with its update DMA
pub struct WaveformPwm15 {
    running: bool,
}

impl WaveformPwm15 {
    /// Configure TIM15 and DMA1 channel 5, output stopped
    #[must_use]
    pub fn new() -> Self {
        pac::RCC.apb2enr().modify(|w| w.set_tim15en(true));
        pac::RCC.ahbenr().modify(|w| w.set_dma1en(true));

        let tim = pac::TIM15;
        tim.cr1().modify(|w| w.set_cen(false));
        tim.psc().write_value(0);
        tim.ccmr_output(0).modify(|w| {
            w.set_ocm(PWM_CHANNEL, tim_vals::Ocm::TOGGLE);
            w.set_ocpe(PWM_CHANNEL, false);
        });
        tim.ccr(PWM_CHANNEL).write(|w| w.set_ccr(0));
        tim.bdtr().modify(|w| w.set_moe(true));
        tim.cr1().modify(|w| w.set_arpe(true));
        Self { running: false }
    }

    /// Read and clear the pending DMA event
    ///
    /// Transfer complete wins if both flags are set.
    #[must_use]
    pub fn take_dma_event() -> Option<DmaEvent> {
        let isr = pac::DMA1.isr().read();
        let event = if isr.tcif(DMA_CHANNEL) {
            Some(DmaEvent::TransferComplete)
        } else if isr.htif(DMA_CHANNEL) {
            Some(DmaEvent::HalfTransfer)
        } else {
            None
        };
        pac::DMA1.ifcr().write(|w| {
            w.set_htif(DMA_CHANNEL, true);
            w.set_tcif(DMA_CHANNEL, true);
            w.set_gif(DMA_CHANNEL, true);
        });
        event
    }

    fn output(&mut self, enable: bool) {
        pac::TIM15
            .ccer()
            .modify(|w| w.set_cce(PWM_CHANNEL, enable));
        pac::TIM15.cr1().modify(|w| w.set_cen(enable));
        self.running = enable;
    }
}

impl WaveformPwm for WaveformPwm15 {
    fn set_period(&mut self, period: u16) {
        pac::TIM15.arr().write(|w| w.set_arr(period.saturating_sub(1)));
        match (period, self.running) {
            (0, true) => self.output(false),
            (1.., false) => self.output(true),
            _ => {}
        }
    }

    fn start_dma(&mut self, buffer: &[u16]) {
        let ch = pac::DMA1.ch(DMA_CHANNEL);
        ch.cr().modify(|w| w.set_en(false));
        ch.par().write_value(pac::TIM15.arr().as_ptr() as u32);
        ch.mar().write_value(buffer.as_ptr() as u32);
        ch.ndtr().write(|w| w.set_ndt(buffer.len() as u16));
        ch.cr().write(|w| {
            w.set_dir(dma_vals::Dir::FROM_MEMORY);
            w.set_minc(true);
            w.set_circ(true);
            w.set_msize(dma_vals::Size::BITS16);
            w.set_psize(dma_vals::Size::BITS16);
            w.set_pl(dma_vals::Pl::VERY_HIGH);
            w.set_htie(true);
            w.set_tcie(true);
            w.set_en(true);
        });

        // First entry loads now; the DMA takes over from the next update
        let first = buffer.first().copied().unwrap_or(0);
        pac::TIM15.arr().write(|w| w.set_arr(first.saturating_sub(1)));
        pac::TIM15.egr().write(|w| w.set_ug(true));
        pac::TIM15.dier().modify(|w| w.set_ude(true));
        self.output(true);
    }

    fn stop_dma(&mut self) {
        pac::TIM15.dier().modify(|w| w.set_ude(false));
        pac::DMA1.ch(DMA_CHANNEL).cr().modify(|w| w.set_en(false));
        let _ = Self::take_dma_event();
    }

    fn stop(&mut self) {
        self.output(false);
        pac::TIM15.arr().write(|w| w.set_arr(0));
    }
}
