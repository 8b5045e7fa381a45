use std::collections::VecDeque;

use graph_error::Result;

use crate::execution::RecordStream;
use crate::pipeline::Mapper;
use crate::record::Record;

/// Applies the caller's mapper to each input record, forwarding its (zero or
/// more) outputs before pulling the next input. Never blocks on the whole
/// input: at most one input record's worth of output is buffered at a time.
pub struct MapStream {
    input: Box<dyn RecordStream>,
    mapper: Mapper,
    pending: VecDeque<Record>,
}

impl MapStream {
    pub fn new(input: Box<dyn RecordStream>, mapper: Mapper) -> Self {
        MapStream {
            input,
            mapper,
            pending: VecDeque::new(),
        }
    }
}

impl RecordStream for MapStream {
    fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(r) = self.pending.pop_front() {
                return Ok(Some(r));
            }
            match self.input.next()? {
                Some(r) => self.pending.extend((self.mapper)(&r)),
                None => return Ok(None),
            }
        }
    }
}
