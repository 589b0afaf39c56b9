//! Text view over a byte stream using ISO-8859-1 (Latin-1).
//!
//! Every byte value maps to exactly one code point, so decoding never
//! fails and any byte sequence survives a decode/encode round trip.
//! Newlines are not translated: lines end at `\n` and keep it.

use std::fmt;
use std::io::{BufRead, Read, Write};

use crate::raw::Stream;
use crate::{Result, StreamError};

const LINE_FEED: u8 = b'\n';

/// Append the Latin-1 decoding of `bytes` to `out`.
pub fn decode_latin1(bytes: &[u8], out: &mut String) {
    out.reserve(bytes.len());
    out.extend(bytes.iter().map(|&byte| char::from(byte)));
}

/// Encode `text` as Latin-1. Fails on the first character above U+00FF
/// without producing partial output.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(c).map_err(|_| StreamError::Unencodable(c)))
        .collect()
}

pub struct TextReader<R> {
    inner: R,
    scratch: Vec<u8>,
}

impl<R: BufRead + Stream> TextReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            scratch: vec![],
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Append the next line, terminator included, to `line` and return the
    /// number of characters read. `0` means end-of-stream.
    ///
    /// If the inner stream fails partway, the characters consumed before
    /// the failure are still appended to `line`.
    pub fn read_line(&mut self, line: &mut String) -> Result<usize> {
        self.scratch.clear();
        let read = self.inner.read_until(LINE_FEED, &mut self.scratch);
        decode_latin1(&self.scratch, line);
        Ok(read?)
    }

    /// Decode everything left in the stream.
    pub fn read_to_string(&mut self) -> Result<String> {
        self.scratch.clear();
        self.inner.read_to_end(&mut self.scratch)?;
        let mut text = String::new();
        decode_latin1(&self.scratch, &mut text);
        Ok(text)
    }

    /// Lazy, forward-only iteration over the remaining lines. Lines already
    /// consumed cannot be read again without reopening the file.
    pub fn lines(&mut self) -> Lines<'_, R> {
        Lines { reader: self }
    }
}

impl<R: BufRead + Stream> Stream for TextReader<R> {
    fn readable(&self) -> bool {
        self.inner.readable()
    }

    fn writable(&self) -> bool {
        false
    }

    fn closed(&self) -> bool {
        self.inner.closed()
    }

    fn close(&mut self) -> Result<()> {
        self.scratch = vec![];
        self.inner.close()
    }
}

pub struct Lines<'a, R> {
    reader: &'a mut TextReader<R>,
}

impl<R: BufRead + Stream> Iterator for Lines<'_, R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(err) => Some(Err(err)),
        }
    }
}

pub struct TextWriter<W> {
    inner: W,
}

impl<W: Write + Stream> TextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Encode `text` and hand it to the inner stream. Returns the number of
    /// characters written.
    pub fn write(&mut self, text: &str) -> Result<usize> {
        if self.inner.closed() {
            return Err(StreamError::Closed);
        }
        let bytes = encode_latin1(text)?;
        self.inner.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Backs `write!` and `writeln!`.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        match args.as_str() {
            Some(text) => self.write(text)?,
            None => self.write(&args.to_string())?,
        };
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

impl<W: Write + Stream> Stream for TextWriter<W> {
    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        self.inner.writable()
    }

    fn closed(&self) -> bool {
        self.inner.closed()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
