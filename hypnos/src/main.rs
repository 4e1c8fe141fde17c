#![no_std]
#![no_main]

// Our Modules
pub mod band_clock;
mod device_constants;

// RTIC Tasks
pub mod startup;
pub mod tasks;

use tasks::*;

// HAL Access
use rp235x_hal as hal;

use defmt_rtt as _; // global logger

// Monotonics
use rtic_monotonics::rp235x::prelude::*;
rp235x_timer_monotonic!(Mono);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    defmt::error!("Panic: {}", defmt::Display2Format(info));
    loop {
        // Halt the CPU
        unsafe {
            hal::sio::spinlock_reset();
        }
    }
}

/// Tell the Boot ROM about our application
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: rp235x_hal::block::ImageDef = rp235x_hal::block::ImageDef::secure_exe();

#[rtic::app(
    device = hal::pac,
    dispatchers = [PIO2_IRQ_0, PIO2_IRQ_1, DMA_IRQ_0],
)]
mod app {
    use crate::band_clock::BandClock;
    use crate::device_constants::{AlarmIntLine, HapticMotor, StatusLed, SyncUart, TouchSense};

    use super::*;

    use reminder_machine::ReminderMachine;
    use rtic_sync::channel::{Receiver, Sender};
    use true_time::TrueClock;

    pub const XTAL_FREQ_HZ: u32 = 12_000_000u32;

    #[shared]
    pub struct Shared {
        pub true_clock: TrueClock<BandClock>,
    }

    #[local]
    pub struct Local {
        pub led: StatusLed,
        pub haptic: HapticMotor,
        pub reminder: ReminderMachine,
        pub sync_uart: SyncUart,
        pub alarm_pin: AlarmIntLine,
        pub touch_pin: TouchSense,
        pub wake_sender: Sender<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        startup::startup(ctx)
    }

    // Nothing to run between events, so park the core
    #[idle(shared = [true_clock])]
    fn idle(ctx: idle::Context) -> ! {
        tasks::idle(ctx)
    }

    extern "Rust" {
        // Reassembles calibration frames and time polls from the dock
        #[task(local = [sync_uart], shared = [true_clock], priority = 1)]
        async fn sync_handler(
            mut ctx: sync_handler::Context,
            mut resync_events: Sender<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
        );

        // Buzzes on wake events and keeps the next alarm armed
        #[task(local = [haptic, reminder], shared = [true_clock], priority = 1)]
        async fn reminder_task(
            mut ctx: reminder_task::Context,
            mut events: Receiver<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
        );

        // Heartbeats the main led
        #[task(local = [led], priority = 2)]
        async fn heartbeat(ctx: heartbeat::Context);

        // Wake sources: the RTC INT line and the touch pad
        #[task(binds = IO_IRQ_BANK0, local = [alarm_pin, touch_pin, wake_sender])]
        fn gpio_irq(mut ctx: gpio_irq::Context);
    }
}
