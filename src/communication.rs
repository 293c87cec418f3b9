//! Commands typed while the clock is running, sent from the input thread to the ticking one.

use std::{path::PathBuf, str::FromStr};

use crate::alarm::AlarmId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Dismiss,
    Snooze,
    Stop(AlarmId),
    Toggle(AlarmId),
    Delete(AlarmId),
    Test(AlarmId),
    Reupload(AlarmId, PathBuf),
    /// plays a song file once without attaching it to an alarm
    Preview(PathBuf),
    StopPreview,
    List,
    Help,
    Quit,
}

impl Message {
    pub const USAGE: &'static str = "commands: dismiss | snooze | stop <id> | toggle <id> | delete <id> | test <id> | reupload <id> <path> | preview <path> | stop-preview | list | help | quit";
}

impl FromStr for Message {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let id = || -> Result<AlarmId, String> {
            rest.split_whitespace()
                .next()
                .ok_or_else(|| format!("{command} needs an alarm id"))?
                .parse::<AlarmId>()
                .map_err(|e| format!("bad alarm id: {e}"))
        };
        match command.to_ascii_lowercase().as_str() {
            "dismiss" | "d" => Ok(Self::Dismiss),
            "snooze" | "s" => Ok(Self::Snooze),
            "stop" => id().map(Self::Stop),
            "toggle" => id().map(Self::Toggle),
            "delete" | "rm" => id().map(Self::Delete),
            "test" => id().map(Self::Test),
            "reupload" => {
                let id = id()?;
                let path = rest
                    .split_once(char::is_whitespace)
                    .map(|(_, path)| path.trim())
                    .filter(|path| !path.is_empty())
                    .ok_or_else(|| "reupload needs a file path".to_string())?;
                Ok(Self::Reupload(id, PathBuf::from(path)))
            }
            "preview" if !rest.is_empty() => Ok(Self::Preview(PathBuf::from(rest))),
            "preview" => Err("preview needs a file path".to_string()),
            "stop-preview" => Ok(Self::StopPreview),
            "list" | "ls" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            "" => Err(Self::USAGE.to_string()),
            other => Err(format!("unknown command {other:?}, {}", Self::USAGE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("dismiss".parse::<Message>(), Ok(Message::Dismiss));
        assert_eq!(" s ".parse::<Message>(), Ok(Message::Snooze));
        assert_eq!("stop 4".parse::<Message>(), Ok(Message::Stop(AlarmId(4))));
        assert_eq!("TOGGLE 2".parse::<Message>(), Ok(Message::Toggle(AlarmId(2))));
        assert_eq!(
            "reupload 3 /music/my song.mp3".parse::<Message>(),
            Ok(Message::Reupload(AlarmId(3), PathBuf::from("/music/my song.mp3")))
        );
        assert_eq!(
            "preview  /music/my song.mp3 ".parse::<Message>(),
            Ok(Message::Preview(PathBuf::from("/music/my song.mp3")))
        );
        assert_eq!("stop-preview".parse::<Message>(), Ok(Message::StopPreview));
    }

    #[test]
    fn rejects_bad_input() {
        assert!("stop".parse::<Message>().is_err());
        assert!("stop x".parse::<Message>().is_err());
        assert!("reupload 3".parse::<Message>().is_err());
        assert!("preview".parse::<Message>().is_err());
        assert!("dance".parse::<Message>().is_err());
        assert!("".parse::<Message>().is_err());
    }
}
