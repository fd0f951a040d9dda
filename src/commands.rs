use morphview::{
    ContactState, DeviceSelector, Directory, Error, Frame, Result, ScanConfig, SensorLibrary,
    Session,
};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// When a polling loop should end: after `--frames` frames, or once Enter is
/// pressed on stdin.
pub struct StopCondition {
    enter: Arc<AtomicBool>,
    remaining: Option<u64>,
}

impl StopCondition {
    pub fn new(frames: Option<u64>) -> Self {
        let enter = Arc::new(AtomicBool::new(false));
        if frames.is_none() {
            eprintln!("Press Enter to exit");
            let flag = enter.clone();
            thread::spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().lock().read_line(&mut line);
                flag.store(true, Ordering::Relaxed);
            });
        }
        Self {
            enter,
            remaining: frames,
        }
    }

    pub fn done(&self) -> bool {
        self.enter.load(Ordering::Relaxed) || self.remaining == Some(0)
    }

    /// Account for one processed frame.
    pub fn tick(&mut self) {
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
    }
}

/// The device named on the command line, otherwise the first one enumerated.
pub fn open<L: SensorLibrary>(
    directory: &Directory<L>,
    device: Option<DeviceSelector>,
) -> Result<Session<L>> {
    match device {
        Some(DeviceSelector::Index(index)) => directory.open(index),
        Some(DeviceSelector::Serial(serial)) => directory.open_by_serial(&serial),
        Some(DeviceSelector::ComPort(port)) => directory.open_by_com_port(&port),
        None => directory.open_first(),
    }
}

pub fn list<L: SensorLibrary>(directory: &Directory<L>) -> Result<()> {
    let devices = directory.list_devices()?;
    if devices.is_empty() {
        println!("No device found");
    }
    for device in devices {
        println!(
            "{:>2}  {:<20} {}",
            device.index,
            device.serial_str(),
            device.com_port_str()
        );
    }
    Ok(())
}

pub fn info<L: SensorLibrary>(
    directory: &Directory<L>,
    device: Option<DeviceSelector>,
) -> Result<()> {
    let mut session = open(directory, device)?;
    let geometry = session.geometry()?;
    println!("Width:          {}mm", geometry.width_mm);
    println!("Height:         {}mm", geometry.height_mm);
    println!("Cols:           {}", geometry.cols);
    println!("Rows:           {}", geometry.rows);
    println!("Max contacts:   {}", geometry.max_contacts);
    println!("Firmware:       {}", session.firmware_info()?);
    println!("LEDs:           {}", session.led_count()?);
    println!("LED brightness: {}", session.max_led_brightness()?);
    println!("Content:        {:?}", session.supported_frame_content()?);
    println!("Frame content:  {:?}", session.frame_content()?);
    println!("Contacts mask:  {:?}", session.contacts_mask()?);
    println!("Min force:      {}", session.contacts_min_force()?);
    println!("Baseline:       {}", session.dynamic_baseline()?);
    println!("Scan detail:    {}", session.scan_detail()?);
    println!("Max frame rate: {}", session.max_frame_rate()?);
    session.close()
}

/// Light the LED under each touch while it is down.
struct LedTracker {
    count: u8,
    on: u16,
}

impl LedTracker {
    fn new<L: SensorLibrary>(session: &Session<L>) -> Result<Self> {
        Ok(Self {
            count: session.led_count()?,
            on: session.max_led_brightness()?,
        })
    }

    fn update<L: SensorLibrary>(&self, session: &mut Session<L>, frame: &Frame) -> Result<()> {
        for contact in &frame.contacts {
            if contact.id >= self.count {
                continue;
            }
            match contact.state {
                ContactState::Start => session.set_led_brightness(contact.id, self.on)?,
                ContactState::End => session.set_led_brightness(contact.id, 0)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn clear<L: SensorLibrary>(&self, session: &mut Session<L>) {
        for led in 0..self.count {
            if let Err(e) = session.set_led_brightness(led, 0) {
                tracing::warn!(led, "turning LED off: {}", e);
                break;
            }
        }
    }
}

fn print_contacts(label: Option<usize>, frame: &Frame) {
    if !frame.has_contacts() {
        return;
    }
    match label {
        Some(device) => println!("\nMorph {} Num Contacts: {}", device, frame.contacts.len()),
        None => println!("Num Contacts: {}", frame.contacts.len()),
    }
    for contact in &frame.contacts {
        println!("Contact ID: {} State: {}", contact.id, contact.state);
    }
}

/// Read every buffered frame and hand it to `each`, sleeping briefly when the
/// sensor had nothing new.
fn poll<L, F>(session: &mut Session<L>, stop: &mut StopCondition, mut each: F) -> Result<()>
where
    L: SensorLibrary,
    F: FnMut(&mut Session<L>, &Frame) -> Result<()>,
{
    let mut frame = Frame::default();
    while !stop.done() {
        session.read_sensor()?;
        let available = session.available_frame_count()?;
        if available == 0 {
            thread::sleep(Duration::from_millis(5));
            continue;
        }
        for _ in 0..available {
            match session.get_frame_into(&mut frame) {
                Ok(()) => {}
                Err(Error::CorruptFrame(reason)) => {
                    tracing::warn!("skipping corrupt frame: {}", reason);
                    continue;
                }
                Err(e) if e.is_recoverable() => break,
                Err(e) => return Err(e),
            }
            each(session, &frame)?;
            stop.tick();
            if stop.done() {
                break;
            }
        }
    }
    Ok(())
}

pub fn contacts<L: SensorLibrary>(
    directory: &Directory<L>,
    device: Option<DeviceSelector>,
    frames: Option<u64>,
) -> Result<()> {
    let mut session = open(directory, device)?;
    session.configure(&ScanConfig::contacts())?;
    let leds = LedTracker::new(&session)?;
    session.start()?;

    let mut stop = StopCondition::new(frames);
    let result = poll(&mut session, &mut stop, |session, frame| {
        print_contacts(None, frame);
        leds.update(session, frame)
    });

    leds.clear(&mut session);
    finish(session, result)
}

pub fn forces<L: SensorLibrary>(
    directory: &Directory<L>,
    device: Option<DeviceSelector>,
    frames: Option<u64>,
) -> Result<()> {
    let mut session = open(directory, device)?;
    session.configure(&ScanConfig::pressure())?;
    session.start()?;

    let mut stop = StopCondition::new(frames);
    let result = poll(&mut session, &mut stop, |_, frame| {
        println!("Total Force: {}", frame.total_force());
        Ok(())
    });
    finish(session, result)
}

/// Contacts from every attached device, round-robin.
pub fn multi<L: SensorLibrary>(directory: &Directory<L>, frames: Option<u64>) -> Result<()> {
    let devices = directory.list_devices()?;
    if devices.is_empty() {
        println!("No device found");
        return Ok(());
    }

    let mut sessions = Vec::with_capacity(devices.len());
    for device in &devices {
        let mut session = directory.open(device.index)?;
        session.configure(&ScanConfig::contacts())?;
        let leds = LedTracker::new(&session)?;
        session.start()?;
        sessions.push((session, leds));
    }

    let mut stop = StopCondition::new(frames);
    let mut result = Ok(());
    'outer: while !stop.done() {
        let mut idle = true;
        for (i, (session, leds)) in sessions.iter_mut().enumerate() {
            let batch = match session.frames() {
                Ok(batch) => batch,
                Err(e) => {
                    result = Err(e);
                    break 'outer;
                }
            };
            idle &= batch.is_empty();
            for frame in &batch {
                print_contacts(Some(i), frame);
                if let Err(e) = leds.update(session, frame) {
                    result = Err(e);
                    break 'outer;
                }
                stop.tick();
            }
        }
        if idle {
            thread::sleep(Duration::from_millis(5));
        }
    }

    for (mut session, leds) in sessions {
        leds.clear(&mut session);
        if let Err(e) = session.close() {
            tracing::warn!("closing device: {}", e);
        }
    }
    result
}

/// Stop and close, reporting the loop's error ahead of any cleanup error.
fn finish<L: SensorLibrary>(mut session: Session<L>, result: Result<()>) -> Result<()> {
    let closed = session.close();
    result?;
    closed
}
