use band_packets::reader::{SyncEvent, SyncReader};
use band_packets::{TimeFrame, TIME_FRAME_LEN};
use defmt::{info, warn, Format};
use embedded_hal::digital::{OutputPin, StatefulOutputPin};
use fugit::ExtU64;
use reminder_machine::ReminderAction;
use rp235x_hal::gpio::Interrupt;
use rtic::Mutex;
use rtic_monotonics::Monotonic;
use rtic_sync::channel::{Receiver, Sender};
use true_time::CalendarTime;

use crate::device_constants::{
    HapticMotor, HEARTBEAT_MILLIS, PULSE_COUNT, PULSE_OFF_MILLIS, PULSE_ON_MILLIS,
    SYNC_POLL_MILLIS,
};
use crate::{app::*, hal, Mono};

/// Depth of the wake event queue
pub const WAKE_QUEUE_DEPTH: usize = 4;

/// Sync receive buffer, two frames deep
pub const SYNC_BUFFER_LEN: usize = 2 * TIME_FRAME_LEN;

/// What pulled the reminder task out of its wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum WakeEvent {
    /// The RTC alarm comparator matched
    Alarm,
    /// The touch pad was tapped
    Touch,
    /// The dock pushed a fresh calibration
    Resync,
}

pub async fn heartbeat(ctx: heartbeat::Context<'_>) {
    loop {
        _ = ctx.local.led.toggle();

        Mono::delay(HEARTBEAT_MILLIS.millis()).await;
    }
}

/// Drains the sync UART, answering time polls and applying calibration
/// frames pushed by the dock.
pub async fn sync_handler(
    mut ctx: sync_handler::Context<'_>,
    mut resync_events: Sender<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
) {
    let mut reader: SyncReader<SYNC_BUFFER_LEN> = SyncReader::new();

    loop {
        let mut scratch = [0u8; SYNC_BUFFER_LEN];
        let read = match ctx.local.sync_uart.read_raw(&mut scratch) {
            Ok(count) => count,
            // Nothing waiting, or a line error; try again next pass
            Err(_) => 0,
        };

        if read == 0 {
            // A frame head with no tail after a full poll interval means
            // the dock was yanked mid-send
            let dropped = reader.discard_stale();
            if dropped > 0 {
                warn!("Dropped {} sync bytes cut off mid-frame", dropped);
            }
        } else {
            reader.push(&scratch[..read]);
        }

        while let Some(event) = reader.poll_event() {
            match event {
                SyncEvent::Frame(frame) => apply_calibration(&mut ctx, frame, &mut resync_events),
                SyncEvent::TimeRequest => answer_time_poll(&mut ctx),
                SyncEvent::Rejected(e) => warn!("Sync frame rejected: {}", e),
            }
        }

        Mono::delay(SYNC_POLL_MILLIS.millis()).await;
    }
}

fn answer_time_poll(ctx: &mut sync_handler::Context<'_>) {
    match ctx.shared.true_clock.lock(|clock| clock.now()) {
        Ok(now) => {
            let frame = TimeFrame::from_calendar(&now);
            ctx.local.sync_uart.write_full_blocking(&frame.as_bytes());
            info!("Time poll answered with {}", now);
        }
        Err(_) => warn!("Time poll: could not read the clock"),
    }
}

fn apply_calibration(
    ctx: &mut sync_handler::Context<'_>,
    frame: TimeFrame,
    resync_events: &mut Sender<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
) {
    let time = frame.to_calendar();

    match ctx.shared.true_clock.lock(|clock| clock.calibrate(&time)) {
        Ok(()) => {
            info!("Calibrated to {}", time);

            // Any alarm armed before this points at the old timeline
            if resync_events.try_send(WakeEvent::Resync).is_err() {
                warn!("Wake queue full, reminder not rearmed");
            }
        }
        Err(_) => warn!("Calibration failed, keeping the previous anchor"),
    }
}

/// Buzzes the wearer on each wake event and keeps the next alarm armed
/// according to the strategy.
pub async fn reminder_task(
    mut ctx: reminder_task::Context<'_>,
    mut events: Receiver<'static, WakeEvent, WAKE_QUEUE_DEPTH>,
) {
    // Boot calibration has just run, so the first arming decision is the
    // same one made after any resync, the disarm case included: the RTC
    // keeps its alarm enable on coin cell across our power cycles
    let boot_action = ctx.local.reminder.after_resync();
    apply_action(&mut ctx, boot_action);

    while let Ok(event) = events.recv().await {
        info!("Wake event: {}", event);

        let action = match event {
            WakeEvent::Alarm => {
                acknowledge_alarm(&mut ctx);
                pulse_haptic(ctx.local.haptic).await;
                ctx.local.reminder.after_alarm()
            }
            WakeEvent::Touch => ctx.local.reminder.after_touch(),
            WakeEvent::Resync => ctx.local.reminder.after_resync(),
        };

        apply_action(&mut ctx, action);
    }
}

/// Three short buzzes, spaced so they read as a nudge rather than a call
async fn pulse_haptic(haptic: &mut HapticMotor) {
    for _ in 0..PULSE_COUNT {
        _ = haptic.set_high();
        Mono::delay(PULSE_ON_MILLIS.millis()).await;
        _ = haptic.set_low();
        Mono::delay(PULSE_OFF_MILLIS.millis()).await;
    }
}

fn apply_action(ctx: &mut reminder_task::Context<'_>, action: ReminderAction) {
    match action {
        ReminderAction::ArmIn(minutes) => arm_reminder(ctx, minutes),
        ReminderAction::ArmAt(target) => rearm_reminder(ctx, target),
        ReminderAction::Keep => {}
        ReminderAction::Disarm => disarm_reminder(ctx),
    }
}

fn arm_reminder(ctx: &mut reminder_task::Context<'_>, minutes: u32) {
    let armed = ctx
        .shared
        .true_clock
        .lock(|clock| -> Result<CalendarTime, hal::i2c::Error> {
            let mut target = clock.now()?;
            target.add_minutes(minutes);
            clock.set_alarm(&target)?;
            clock.enable_alarm()?;
            Ok(target)
        });

    match armed {
        Ok(target) => {
            ctx.local.reminder.record_armed(target);
            info!("Next reminder at {}", target);
        }
        Err(_) => warn!("Could not arm the reminder alarm"),
    }
}

/// Programs a surviving target again after a calibration moved the anchor
fn rearm_reminder(ctx: &mut reminder_task::Context<'_>, target: CalendarTime) {
    let result = ctx.shared.true_clock.lock(|clock| {
        clock.set_alarm(&target)?;
        clock.enable_alarm()
    });

    match result {
        Ok(()) => info!("Reminder rearmed for {}", target),
        Err(_) => warn!("Could not rearm the reminder alarm"),
    }
}

fn acknowledge_alarm(ctx: &mut reminder_task::Context<'_>) {
    let result = ctx.shared.true_clock.lock(|clock| {
        clock.clear_alarm()?;
        clock.disable_alarm()
    });

    if result.is_err() {
        warn!("Could not acknowledge the alarm");
    }
}

fn disarm_reminder(ctx: &mut reminder_task::Context<'_>) {
    let result = ctx.shared.true_clock.lock(|clock| clock.disable_alarm());

    if result.is_err() {
        warn!("Could not disarm the reminder alarm");
    }
}

pub fn gpio_irq(ctx: gpio_irq::Context<'_>) {
    if ctx.local.alarm_pin.interrupt_status(Interrupt::EdgeLow) {
        ctx.local.alarm_pin.clear_interrupt(Interrupt::EdgeLow);

        if ctx.local.wake_sender.try_send(WakeEvent::Alarm).is_err() {
            warn!("Wake queue full, dropped an alarm event");
        }
    }

    if ctx.local.touch_pin.interrupt_status(Interrupt::EdgeHigh) {
        ctx.local.touch_pin.clear_interrupt(Interrupt::EdgeHigh);

        if ctx.local.wake_sender.try_send(WakeEvent::Touch).is_err() {
            warn!("Wake queue full, dropped a touch event");
        }
    }
}

pub fn idle(mut ctx: idle::Context) -> ! {
    info!("Idle, core sleeps between interrupts");

    loop {
        ctx.shared
            .true_clock
            .lock(|clock| clock.enter_low_power_mode());
    }
}
