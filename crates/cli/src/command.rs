use std::str::FromStr;

/// One line typed at the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Analyze,
    Download,
    Status,
    Log,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  start      open the camera and begin monitoring
  stop       stop monitoring and release the camera
  analyze    analyze the current frame once
  download   fetch the model weight files
  status     show session state and the current readout
  log        show recent session events (newest first)
  help       show this list
  quit       stop and exit";

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "analyze" | "once" => Ok(Command::Analyze),
            "download" => Ok(Command::Download),
            "status" => Ok(Command::Status),
            "log" => Ok(Command::Log),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_commands_case_insensitively() {
        assert_eq!("start".parse::<Command>(), Ok(Command::Start));
        assert_eq!("  STOP \n".parse::<Command>(), Ok(Command::Stop));
        assert_eq!("once".parse::<Command>(), Ok(Command::Analyze));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_unknown_command_is_error() {
        let err = "dance".parse::<Command>().unwrap_err();
        assert!(err.contains("dance"));
    }
}
