use std::{
    error::Error,
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use clap::{command, Parser, Subcommand};
use log::{error, info};
use roosty_alarm::{
    audio::{AudioBackend, RodioBackend},
    communication::Message,
    engine::TickEvent,
    storage::FileStorage,
    AlarmClock, AlarmDraft, AlarmId, Config, CustomFile, MinuteOfDay, Ringtone,
};

const TICK: Duration = Duration::from_secs(1);

type Clock = AlarmClock<RodioBackend, FileStorage>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// create an alarm, HH:MM in 24 hour time
    Add {
        time: String,
        label: String,
        #[clap(long, short)]
        ringtone: Option<Ringtone>,
        /// play for this many minutes instead of waiting to be dismissed
        #[clap(long, short)]
        duration: Option<u32>,
        /// play for the configured default duration
        #[clap(long, short)]
        timed: bool,
        /// a song to use instead of a built in ringtone
        #[clap(long, short)]
        file: Option<PathBuf>,
    },
    List,
    Delete {
        id: AlarmId,
    },
    Toggle {
        id: AlarmId,
    },
    /// play an alarm's sound once
    Test {
        id: AlarmId,
    },
    /// play a song file once, to check it can be used for an alarm
    Preview {
        path: PathBuf,
    },
    /// keep checking the alarms, this is the default
    Run,
}

fn read_song(path: &Path) -> io::Result<CustomFile> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    Ok(CustomFile { name, bytes })
}

fn wait_until_finished(clock: &Clock) {
    if let Some(handle) = clock.session().handle() {
        while !clock.session().backend().is_finished(handle) {
            thread::sleep(Duration::from_millis(100));
        }
    }
}

fn print_notices(clock: &mut Clock) {
    for notice in clock.take_notices() {
        println!("{notice}");
    }
}

fn print_alarms(clock: &Clock) {
    let views = clock.views();
    if views.is_empty() {
        println!("no alarms");
    }
    for view in views {
        println!("{view}");
    }
}

fn report(clock: &Clock, events: &[TickEvent]) {
    let label = |id: AlarmId| {
        clock
            .store()
            .find(id)
            .map_or_else(|| id.to_string(), |alarm| alarm.label.clone())
    };
    for event in events {
        match event {
            TickEvent::Triggered { message, .. } => {
                println!("ALARM: {message} (dismiss or snooze)");
            }
            TickEvent::Started { id, .. } => println!("{} started playing", label(*id)),
            TickEvent::Stopped { id } => println!("{} stopped", label(*id)),
            TickEvent::Rearmed { .. } | TickEvent::Failed { .. } => {}
        }
    }
}

fn handle(clock: &mut Clock, message: Message) {
    let time_format = clock.config().time_format.clone();
    let result = match message {
        Message::Dismiss => {
            match clock.dismiss() {
                Some(id) => println!("dismissed alarm {id}"),
                None => println!("nothing is ringing"),
            }
            Ok(())
        }
        Message::Snooze => {
            match clock.snooze() {
                Some(time) => println!("snoozed until {}", time.format(&time_format)),
                None => println!("nothing is ringing"),
            }
            Ok(())
        }
        Message::Stop(id) => {
            if !clock.stop(id) {
                println!("alarm {id} isn't playing");
            }
            Ok(())
        }
        Message::Toggle(id) => clock.toggle(id).map(|active| {
            println!("alarm {id} {}", if active { "enabled" } else { "disabled" });
        }),
        Message::Delete(id) => clock.delete(id),
        Message::Test(id) => clock.test(id),
        Message::Reupload(id, path) => match read_song(&path) {
            Ok(file) => clock.reupload(id, file),
            Err(e) => {
                error!("couldn't read {}: {e}", path.display());
                println!("couldn't read {}: {e}", path.display());
                Ok(())
            }
        },
        Message::Preview(path) => match read_song(&path) {
            Ok(file) => clock.preview(&file),
            Err(e) => {
                error!("couldn't read {}: {e}", path.display());
                println!("couldn't read {}: {e}", path.display());
                Ok(())
            }
        },
        Message::StopPreview => {
            clock.stop_preview();
            Ok(())
        }
        Message::List => {
            print_alarms(clock);
            Ok(())
        }
        Message::Help | Message::Quit => {
            println!("{}", Message::USAGE);
            Ok(())
        }
    };
    if let Err(e) = result {
        println!("{e}");
    }
}

fn run(clock: &mut Clock) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Message>() {
                Ok(message) => {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => println!("{e}"),
            }
        }
    });

    println!("{}", Message::USAGE);
    print_alarms(clock);
    let mut input_open = true;
    let mut next_tick = Instant::now();
    loop {
        let now = Instant::now();
        if now >= next_tick {
            let events = clock.tick(MinuteOfDay::now());
            report(clock, &events);
            print_notices(clock);
            next_tick = now + TICK;
        }
        let wait = next_tick.saturating_duration_since(Instant::now());
        if !input_open {
            // no more commands, just keep the alarms going
            thread::sleep(wait);
            continue;
        }
        match rx.recv_timeout(wait) {
            Ok(Message::Quit) => break,
            Ok(message) => {
                handle(clock, message);
                print_notices(clock);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("input closed");
                input_open = false;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("roosty_alarm")
        .map_err(|e| format!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let config_path = Config::config_path()?;
    if let Some(Command::Init { force }) = args.command {
        if force || !Config::is_config_present() {
            Config::new().save(&config_path)?;
            println!("wrote {}", config_path.display());
        } else {
            println!("{} already exists, use --force to overwrite", config_path.display());
        }
        return Ok(());
    }

    let config = Config::load_or_default(&config_path)?;
    let storage = FileStorage::new(config.storage_dir()?, config.storage_quota_bytes);
    let backend = RodioBackend::new(config.volume);
    let mut clock = AlarmClock::new(config, backend, storage);

    match args.command {
        Some(Command::Add {
            time,
            label,
            ringtone,
            duration,
            timed,
            file,
        }) => {
            let file = file.as_deref().map(read_song).transpose()?;
            let ringtone = if file.is_some() {
                Ringtone::Custom
            } else {
                ringtone.unwrap_or_default()
            };
            let id = clock.add(AlarmDraft {
                time,
                label,
                ringtone,
                timed: timed || duration.is_some(),
                duration_minutes: duration,
                file,
            })?;
            print_notices(&mut clock);
            if ringtone.is_custom() {
                println!("songs aren't saved between runs, use `reupload {id} <path>` once the clock is running");
            }
            println!("added alarm {id}");
        }
        Some(Command::List) => print_alarms(&clock),
        Some(Command::Delete { id }) => {
            clock.delete(id)?;
            println!("deleted alarm {id}");
        }
        Some(Command::Toggle { id }) => {
            let active = clock.toggle(id)?;
            println!("alarm {id} {}", if active { "enabled" } else { "disabled" });
        }
        Some(Command::Test { id }) => {
            clock.test(id)?;
            wait_until_finished(&clock);
        }
        Some(Command::Preview { path }) => {
            clock.preview(&read_song(&path)?)?;
            wait_until_finished(&clock);
        }
        Some(Command::Run) | None => run(&mut clock),
        Some(Command::Init { .. }) => {}
    }
    print_notices(&mut clock);
    Ok(())
}
