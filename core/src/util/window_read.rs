use std::io::Read;

use super::window::Window;

/// A [`Read`] adapter that records every byte it hands out in a [`Window`],
/// so raw markup can be cut out of the stream after a parser has consumed it
pub struct WindowRead<R> {
    inner: R,
    window: Window,
}

impl<R: Read> Read for WindowRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.window.extend(&buf[0..len]);
        Ok(len)
    }
}

impl<R> WindowRead<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            window: Window::default(),
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }
}
