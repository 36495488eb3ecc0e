//! Real-time output strategies
//!
//! | Strategy          | Context            | Tick      | SPI bus   |
//! |-------------------|--------------------|-----------|-----------|
//! | `InterruptToggle` | symbol timer ISR   | suspended | bit-bang  |
//! | `DmaWaveform`     | DMA ISRs           | running   | bit-bang  |
//! | `BusyWait`        | main loop          | suspended | bit-bang  |
//! | `FifoStream`      | main loop          | running   | SPI       |
//! | `TickStepped`     | main loop          | running   | SPI / I2C |

pub mod busy_wait;
pub mod dma;
pub mod fifo;
pub mod interrupt;
pub mod stepped;
