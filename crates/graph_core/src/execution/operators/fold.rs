use graph_error::Result;

use crate::execution::RecordStream;
use crate::pipeline::Folder;
use crate::record::Record;

/// Reduces the whole input to a single accumulator record, emitted once at
/// end of input.
pub struct FoldStream {
    input: Box<dyn RecordStream>,
    folder: Folder,
    initial: Record,
    done: bool,
}

impl FoldStream {
    pub fn new(input: Box<dyn RecordStream>, folder: Folder, initial: Record) -> Self {
        FoldStream {
            input,
            folder,
            initial,
            done: false,
        }
    }
}

impl RecordStream for FoldStream {
    fn next(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        let mut acc = self.initial.clone();
        while let Some(r) = self.input.next()? {
            acc = (self.folder)(&r, &acc);
        }
        self.done = true;
        Ok(Some(acc))
    }
}
