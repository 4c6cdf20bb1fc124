use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::error::HarnessError;

/// One end of a duplex connection: sends `S`, receives `R`.
/// Messages arrive in the order they were sent.
pub struct Pipe<S, R> {
    tx: Sender<S>,
    rx: Receiver<R>,
}

/// Creates both ends of a connection
pub fn duplex<A, B>() -> (Pipe<A, B>, Pipe<B, A>) {
    let (a_tx, a_rx) = mpsc::channel();
    let (b_tx, b_rx) = mpsc::channel();
    (Pipe { tx: a_tx, rx: b_rx }, Pipe { tx: b_tx, rx: a_rx })
}

impl<S, R> Pipe<S, R> {
    pub fn send(
        &self,
        message: S,
    ) -> Result<(), HarnessError> {
        self.tx.send(message).map_err(|_| HarnessError::PipeClosed("send"))
    }

    /// Blocks until a message arrives
    pub fn recv(&self) -> Result<R, HarnessError> { self.rx.recv().map_err(|_| HarnessError::PipeClosed("recv")) }

    /// Takes the next message, if one is waiting.
    /// Messages sent before the other end went away are still delivered.
    pub fn poll(&self) -> Result<Option<R>, HarnessError> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(HarnessError::PipeClosed("poll")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplex_fifo() -> Result<(), HarnessError> {
        let (parent, child) = duplex::<u32, String>();
        assert!(child.poll()?.is_none());

        parent.send(1)?;
        parent.send(2)?;
        assert_eq!(child.poll()?, Some(1));
        assert_eq!(child.recv()?, 2);

        child.send("pong".to_string())?;
        assert_eq!(parent.recv()?, "pong");
        Ok(())
    }

    #[test]
    fn test_pending_messages_survive_closed_end() -> Result<(), HarnessError> {
        let (parent, child) = duplex::<u32, u32>();
        child.send(7)?;
        drop(child);

        assert_eq!(parent.poll()?, Some(7));
        assert!(matches!(parent.poll(), Err(HarnessError::PipeClosed(_))));
        assert!(parent.send(1).is_err());
        Ok(())
    }
}
