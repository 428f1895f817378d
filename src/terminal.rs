use std::io::{self, BufRead, Stdout, StdinLock, Write};
use libc::c_int;

use crate::{Decision, Operator, Result};

/// Puts a terminal into non-canonical, no-echo mode so that single key presses can be read,
/// and restores the previous mode when dropped. Does nothing if `fd` is not a terminal.
struct RawMode {
    fd: c_int,
    saved: Option<libc::termios>,
}

impl RawMode {
    fn enter(fd: c_int) -> io::Result<RawMode> {
        unsafe {
            if libc::isatty(fd) == 0 {
                return Ok(RawMode { fd, saved: None })
            }
            let mut saved: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &mut saved) == -1 {
                return Err(io::Error::last_os_error())
            }
            let mut raw = saved;
            raw.c_lflag &= !(libc::ICANON | libc::ECHO);
            if libc::tcsetattr(fd, libc::TCSANOW, &raw) == -1 {
                return Err(io::Error::last_os_error())
            }
            log::trace!("entered raw mode on fd {}", fd);
            Ok(RawMode { fd, saved: Some(saved) })
        }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.as_ref() {
            // SAFETY: `saved` was filled in by `tcgetattr` on the same fd.
            if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, saved) } == -1 {
                log::warn!("error restoring terminal mode: {}", io::Error::last_os_error())
            } else {
                log::trace!("left raw mode on fd {}", self.fd);
            }
        }
    }
}

/// Operator at an interactive terminal.
#[derive(Debug)]
pub struct TerminalOperator<R: BufRead, W: Write> {
    input: R,
    output: W,
    // terminal switched into raw mode while waiting for a key press
    raw_fd: Option<c_int>,
}

impl TerminalOperator<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        TerminalOperator {
            input: io::stdin().lock(),
            output: io::stdout(),
            raw_fd: Some(libc::STDIN_FILENO),
        }
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    /// Operator reading answers from `input` as-is, without any terminal mode changes.
    pub fn new(input: R, output: W) -> Self {
        TerminalOperator { input, output, raw_fd: None }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8];
        match self.input.read(&mut byte)? {
            0 => Err(io::ErrorKind::UnexpectedEof.into()),
            _ => Ok(byte[0]),
        }
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn confirm(&mut self) -> Result<Decision> {
        writeln!(self.output, "Press 'c' to continue or 'q' to exit.")?;
        self.output.flush()?;
        let _raw_mode = self.raw_fd.map(RawMode::enter).transpose()?;
        loop {
            match self.read_byte()? {
                b'c' | b'C' => return Ok(Decision::Continue),
                b'q' | b'Q' => return Ok(Decision::Quit),
                _ => (),
            }
        }
    }

    fn read_voltage(&mut self, prompt: &str) -> Result<Option<f32>> {
        writeln!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        // skip blank lines, e.g. the rest of the line a key press was read from
        while line.trim().is_empty() {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into())
            }
        }
        Ok(line.trim().parse::<f32>().ok())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;
    use crate::Error;

    fn operator(input: &str) -> TerminalOperator<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(operator: TerminalOperator<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(operator.into_output()).unwrap()
    }

    #[test]
    fn test_confirm_skips_other_keys() {
        let mut operator = operator("xyz\nC");
        assert_eq!(operator.confirm().unwrap(), Decision::Continue);
        assert_eq!(output(operator), "Press 'c' to continue or 'q' to exit.\n");
    }

    #[test]
    fn test_confirm_quit() {
        let mut operator = operator("aq");
        assert_eq!(operator.confirm().unwrap(), Decision::Quit);
    }

    #[test]
    fn test_confirm_end_of_input() {
        let mut operator = operator("xyz\n");
        match operator.confirm() {
            Err(Error::Io(error)) => assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof),
            result => panic!("unexpected {:?}", result),
        }
    }

    #[test]
    fn test_read_voltage() {
        let mut operator = operator("c\n 4.75 \nfoo\n");
        assert_eq!(operator.confirm().unwrap(), Decision::Continue);
        assert_eq!(operator.read_voltage("Enter reference voltage: ").unwrap(), Some(4.75));
        assert_eq!(operator.read_voltage("Enter reference voltage: ").unwrap(), None);
        assert!(operator.read_voltage("Enter reference voltage: ").is_err());
    }

    #[test]
    fn test_notify() {
        let mut operator = operator("");
        operator.notify("Connect CH1 to ground.").unwrap();
        assert_eq!(output(operator), "Connect CH1 to ground.\n");
    }
}
