//! In-memory producer over a list of chunks (inline bodies and tests).

use std::collections::VecDeque;
use std::io;

use super::{exhausted, BodyProducer};

#[derive(Debug, Default)]
pub struct ChunkProducer {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkProducer {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl BodyProducer for ChunkProducer {
    fn has_more(&mut self) -> io::Result<bool> {
        Ok(!self.chunks.is_empty())
    }

    fn take_next(&mut self) -> io::Result<Vec<u8>> {
        self.chunks.pop_front().ok_or_else(exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_chunks_in_order_then_stops() {
        let mut p = ChunkProducer::new(vec!["ab", "c"]);
        assert!(p.has_more().unwrap());
        assert_eq!(p.take_next().unwrap(), b"ab");
        assert_eq!(p.remaining(), 1);
        assert_eq!(p.take_next().unwrap(), b"c");
        assert!(!p.has_more().unwrap());
        assert_eq!(
            p.take_next().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
}
