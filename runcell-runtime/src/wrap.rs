//! Standard-output capture wrapping
//!
//! Wrapping prefixes the user's code with a prologue that points `sys.stdout`
//! at a fresh `io.StringIO` and appends an epilogue expression yielding the
//! buffer's contents. An interpreter that returns the value of the final
//! expression then hands back everything the code printed as one string.
//!
//! The buffer is the only global the wrapper binds. Modules are reached via
//! `__import__` so the user's own `io` and `sys` names are left alone.

/// Name of the capture buffer bound in the interpreter's globals
pub const DEFAULT_BUFFER: &str = "__runcell_out";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureWrapper {
    buffer: String,
}

impl Default for CaptureWrapper {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl CaptureWrapper {
    pub fn new(buffer: impl Into<String>) -> Self {
        Self {
            buffer: buffer.into(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn prologue(&self) -> String {
        format!(
            "{buf} = __import__(\"io\").StringIO()\n__import__(\"sys\").stdout = {buf}\n",
            buf = self.buffer
        )
    }

    pub fn epilogue(&self) -> String {
        format!("\n{}.getvalue()", self.buffer)
    }

    pub fn wrap(&self, code: &str) -> String {
        let mut wrapped = self.prologue();
        wrapped.push_str(code);
        wrapped.push_str(&self.epilogue());
        wrapped
    }
}
