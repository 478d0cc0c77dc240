//! Controller for the traced child process.
//!
//! Wraps ptrace for a single-threaded tracee: spawning (the in-memory ELF is
//! materialized as an anonymous memfd and exec'd from there), word-sized
//! memory access, register access, resume/wait and the kernel memory-map
//! view. All operations assume the tracee is stopped; the debugger core
//! guarantees that by always following a resume with a `wait`.

use std::ffi::CString;
use std::os::fd::AsRawFd;

use libc::user_regs_struct;
use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::sys::ptrace;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fexecve, fork, write, ForkResult, Pid};
use thiserror::Error;

use crate::disasm::Bitness;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to spawn tracee: {0}")]
    SpawnFailed(String),
    #[error("memory fault at {addr:#x}")]
    MemoryFault { addr: u64 },
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("the tracee is gone")]
    TraceeGone,
    #[error("ptrace operation failed: {0}")]
    Os(#[from] nix::Error),
}

/// Why `wait` returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// SIGTRAP: a breakpoint, a single-step, or the initial exec stop.
    Trap,
    /// Normal exit with the given code.
    Exited(i32),
    /// Stopped by a signal other than SIGTRAP; the tracee remains stopped.
    Signalled(Signal),
    /// Terminated by a signal.
    Killed(Signal),
}

/// Register file of a stopped tracee.
///
/// Access is by case-folded name; 32-bit aliases (`eax`, `eip`, `r8d`, …)
/// map onto the 64-bit slots, with the upper bits ignored by the caller.
#[derive(Clone, Copy)]
pub struct Registers {
    raw: user_regs_struct,
}

/// Display names in context order, with their 32-bit spellings.
pub const REGISTER_NAMES: &[(&str, &str)] = &[
    ("rax", "eax"),
    ("rbx", "ebx"),
    ("rcx", "ecx"),
    ("rdx", "edx"),
    ("rsi", "esi"),
    ("rdi", "edi"),
    ("r8", "r8d"),
    ("r9", "r9d"),
    ("r10", "r10d"),
    ("r11", "r11d"),
    ("r12", "r12d"),
    ("r13", "r13d"),
    ("r14", "r14d"),
    ("r15", "r15d"),
    ("rsp", "esp"),
    ("rbp", "ebp"),
    ("rip", "eip"),
];

impl Registers {
    pub fn get(&self, name: &str) -> Option<u64> {
        Some(match canonical(name)? {
            "rax" => self.raw.rax,
            "rbx" => self.raw.rbx,
            "rcx" => self.raw.rcx,
            "rdx" => self.raw.rdx,
            "rsi" => self.raw.rsi,
            "rdi" => self.raw.rdi,
            "rbp" => self.raw.rbp,
            "rsp" => self.raw.rsp,
            "r8" => self.raw.r8,
            "r9" => self.raw.r9,
            "r10" => self.raw.r10,
            "r11" => self.raw.r11,
            "r12" => self.raw.r12,
            "r13" => self.raw.r13,
            "r14" => self.raw.r14,
            "r15" => self.raw.r15,
            "rip" => self.raw.rip,
            "eflags" => self.raw.eflags,
            _ => return None,
        })
    }

    pub fn set(&mut self, name: &str, value: u64) -> Result<(), TraceError> {
        let slot = match canonical(name).ok_or_else(|| TraceError::UnknownRegister(name.into()))? {
            "rax" => &mut self.raw.rax,
            "rbx" => &mut self.raw.rbx,
            "rcx" => &mut self.raw.rcx,
            "rdx" => &mut self.raw.rdx,
            "rsi" => &mut self.raw.rsi,
            "rdi" => &mut self.raw.rdi,
            "rbp" => &mut self.raw.rbp,
            "rsp" => &mut self.raw.rsp,
            "r8" => &mut self.raw.r8,
            "r9" => &mut self.raw.r9,
            "r10" => &mut self.raw.r10,
            "r11" => &mut self.raw.r11,
            "r12" => &mut self.raw.r12,
            "r13" => &mut self.raw.r13,
            "r14" => &mut self.raw.r14,
            "r15" => &mut self.raw.r15,
            "rip" => &mut self.raw.rip,
            "eflags" => &mut self.raw.eflags,
            _ => return Err(TraceError::UnknownRegister(name.into())),
        };
        *slot = value;
        Ok(())
    }

    pub fn instruction_pointer(&self) -> u64 {
        self.raw.rip
    }

    pub fn set_instruction_pointer(&mut self, value: u64) {
        self.raw.rip = value;
    }

    pub fn stack_pointer(&self) -> u64 {
        self.raw.rsp
    }

    pub fn flags(&self) -> u64 {
        self.raw.eflags
    }
}

#[cfg(test)]
impl Default for Registers {
    fn default() -> Self {
        // plain-integer struct, an all-zero pattern is valid
        Registers {
            raw: unsafe { std::mem::zeroed() },
        }
    }
}

/// Fold a user-supplied register name to its 64-bit canonical spelling.
fn canonical(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    for (name64, name32) in REGISTER_NAMES {
        if lower == *name64 || lower == *name32 {
            return Some(*name64);
        }
    }
    (lower == "eflags").then_some("eflags")
}

/// A spawned child being debugged.
pub struct Tracee {
    pid: Pid,
    bitness: Bitness,
    alive: bool,
}

impl Tracee {
    /// Fork a child that loads `image` into an anonymous in-memory file,
    /// marks itself traced and execs it with `argv` and an empty environment.
    ///
    /// Returns once the initial exec SIGTRAP has been observed.
    pub fn spawn(
        image: &[u8],
        name: &str,
        args: &[String],
        bitness: Bitness,
    ) -> Result<Self, TraceError> {
        // allocate everything the child needs before forking
        let name_c = CString::new(name)
            .map_err(|_| TraceError::SpawnFailed("executable name contains NUL".into()))?;
        let mut argv = vec![name_c.clone()];
        for arg in args {
            argv.push(
                CString::new(arg.as_str())
                    .map_err(|_| TraceError::SpawnFailed("argument contains NUL".into()))?,
            );
        }
        let envp: [CString; 0] = [];

        match unsafe { fork() }.map_err(|err| TraceError::SpawnFailed(err.to_string()))? {
            ForkResult::Child => {
                let status = exec_in_child(image, &name_c, &argv, &envp);
                // only reached when the exec failed
                eprintln!("failed to exec tracee: {status:?}");
                std::process::exit(101);
            }
            ForkResult::Parent { child } => {
                match waitpid(child, None) {
                    Ok(WaitStatus::Stopped(_, Signal::SIGTRAP)) => {}
                    Ok(other) => {
                        return Err(TraceError::SpawnFailed(format!(
                            "expected the exec trap, got {other:?}"
                        )))
                    }
                    Err(err) => return Err(TraceError::SpawnFailed(err.to_string())),
                }
                log::debug!("spawned tracee (pid {child})");
                Ok(Tracee {
                    pid: child,
                    bitness,
                    alive: true,
                })
            }
        }
    }

    pub fn word_size(&self) -> u64 {
        self.bitness.word_size()
    }

    /// Read one machine word (4 bytes on a 32-bit image, 8 on 64-bit).
    pub fn read_word(&self, addr: u64) -> Result<u64, TraceError> {
        let raw = self.peek(addr)?;
        Ok(match self.bitness {
            Bitness::Bits32 => raw as u64 & 0xffff_ffff,
            Bitness::Bits64 => raw as u64,
        })
    }

    /// Write one machine word. On a 32-bit image the upper half of the
    /// containing 8-byte ptrace word is preserved.
    pub fn write_word(&self, addr: u64, word: u64) -> Result<(), TraceError> {
        let data = match self.bitness {
            Bitness::Bits32 => {
                let raw = self.peek(addr)? as u64;
                (raw & !0xffff_ffff) | (word & 0xffff_ffff)
            }
            Bitness::Bits64 => word,
        };
        unsafe { ptrace::write(self.pid, addr as ptrace::AddressType, data as *mut libc::c_void) }
            .map_err(|err| self.memory_error(err, addr))
    }

    fn peek(&self, addr: u64) -> Result<libc::c_long, TraceError> {
        ptrace::read(self.pid, addr as ptrace::AddressType)
            .map_err(|err| self.memory_error(err, addr))
    }

    fn memory_error(&self, err: nix::Error, addr: u64) -> TraceError {
        match err {
            nix::Error::ESRCH => TraceError::TraceeGone,
            _ => TraceError::MemoryFault { addr },
        }
    }

    pub fn read_registers(&self) -> Result<Registers, TraceError> {
        let raw = ptrace::getregs(self.pid)?;
        Ok(Registers { raw })
    }

    pub fn write_registers(&self, registers: &Registers) -> Result<(), TraceError> {
        ptrace::setregs(self.pid, registers.raw)?;
        Ok(())
    }

    /// Resume until the next signal. Must be followed by [`Tracee::wait`].
    pub fn cont(&self) -> Result<(), TraceError> {
        ptrace::cont(self.pid, None)?;
        Ok(())
    }

    /// Execute one instruction. Must be followed by [`Tracee::wait`].
    pub fn single_step(&self) -> Result<(), TraceError> {
        ptrace::step(self.pid, None)?;
        Ok(())
    }

    /// Block until the tracee stops or terminates.
    pub fn wait(&mut self) -> Result<StopReason, TraceError> {
        loop {
            match waitpid(self.pid, None)? {
                WaitStatus::Stopped(_, Signal::SIGTRAP) => return Ok(StopReason::Trap),
                WaitStatus::Stopped(_, sig) => return Ok(StopReason::Signalled(sig)),
                WaitStatus::Exited(_, code) => {
                    self.alive = false;
                    return Ok(StopReason::Exited(code));
                }
                WaitStatus::Signaled(_, sig, _) => {
                    self.alive = false;
                    return Ok(StopReason::Killed(sig));
                }
                // not requested; keep waiting
                _ => continue,
            }
        }
    }

    /// Verbatim contents of the kernel's memory-map view for the tracee.
    pub fn read_maps(&self) -> Result<String, TraceError> {
        if !self.alive {
            return Err(TraceError::TraceeGone);
        }
        std::fs::read_to_string(format!("/proc/{}/maps", self.pid))
            .map_err(|_| TraceError::TraceeGone)
    }

    /// Resume the tracee with SIGKILL and reap it.
    pub fn kill(&mut self) {
        if !self.alive {
            return;
        }
        if ptrace::cont(self.pid, Signal::SIGKILL).is_err() {
            let _ = signal::kill(self.pid, Signal::SIGKILL);
        }
        let _ = waitpid(self.pid, None);
        self.alive = false;
    }
}

impl Drop for Tracee {
    fn drop(&mut self) {
        // the pid must be released on every path
        self.kill();
    }
}

fn exec_in_child(
    image: &[u8],
    name: &CString,
    argv: &[CString],
    envp: &[CString],
) -> TraceError {
    let fd = match memfd_create(name, MemFdCreateFlag::MFD_CLOEXEC) {
        Ok(fd) => fd,
        Err(err) => return TraceError::SpawnFailed(format!("memfd_create: {err}")),
    };

    let mut offset = 0;
    while offset < image.len() {
        match write(fd.as_raw_fd(), &image[offset..]) {
            Ok(n) => offset += n,
            Err(err) => return TraceError::SpawnFailed(format!("write: {err}")),
        }
    }

    if let Err(err) = ptrace::traceme() {
        return TraceError::SpawnFailed(format!("traceme: {err}"));
    }

    match fexecve(fd.as_raw_fd(), argv, envp) {
        Ok(infallible) => match infallible {},
        Err(err) => TraceError::SpawnFailed(format!("fexecve: {err}")),
    }
}

/// First base address out of a `/proc/<pid>/maps` dump.
pub fn parse_load_base(maps: &str) -> Option<u64> {
    let first = maps.lines().next()?;
    let hex = first.split('-').next()?;
    u64::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::canonical("rax", Some("rax"))]
    #[case::folded("RAX", Some("rax"))]
    #[case::alias_32("eax", Some("rax"))]
    #[case::numbered("r10d", Some("r10"))]
    #[case::ip_alias("EIP", Some("rip"))]
    #[case::flags("eflags", Some("eflags"))]
    #[case::unknown("xmm0", None)]
    fn folds_register_names(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(canonical(name), expected);
    }

    #[test]
    fn register_set_and_get_share_a_slot() {
        let mut regs = Registers::default();
        regs.set("EAX", 0x41).unwrap();
        assert_eq!(regs.get("rax"), Some(0x41));

        regs.set("rip", 0x401120).unwrap();
        assert_eq!(regs.instruction_pointer(), 0x401120);
    }

    #[test]
    fn unknown_register_is_rejected() {
        let mut regs = Registers::default();
        assert!(matches!(
            regs.set("cr3", 1),
            Err(TraceError::UnknownRegister(_))
        ));
    }

    #[test]
    fn parses_the_first_maps_field() {
        let maps = "555555554000-555555558000 r--p 00000000 08:01 131 /usr/bin/true\n\
                    7ffff7dd5000-7ffff7dfc000 r-xp 00000000 08:01 297 /lib/ld.so\n";
        assert_eq!(parse_load_base(maps), Some(0x5555_5555_4000));
        assert_eq!(parse_load_base(""), None);
    }
}
