//! Storage abstraction for file systems (flash filesystem or SD card)

/// Storage trait for path-addressed file access
pub trait Storage {
    /// Error type
    type Error: core::fmt::Debug;
    /// Readable file type
    type File: File;
    /// Writable file type
    type Writer: FileWriter;

    /// Open file for reading
    fn open_file(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<Self::File, Self::Error>>;

    /// Create (or truncate) a file for writing
    fn create_file(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<Self::Writer, Self::Error>>;

    /// Check if path exists
    fn exists(
        &mut self,
        path: &str,
    ) -> impl core::future::Future<Output = Result<bool, Self::Error>>;
}

/// File trait for reading files
pub trait File {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read from current position
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Seek to position
    fn seek(&mut self, pos: u64) -> impl core::future::Future<Output = Result<u64, Self::Error>>;

    /// Get file size
    fn size(&self) -> u64;
}

/// File trait for writing binary data
pub trait FileWriter {
    /// Error type
    type Error: core::fmt::Debug;

    /// Append `data`, returning the number of bytes written
    fn write(
        &mut self,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<usize, Self::Error>>;

    /// Flush buffered data to the medium
    fn flush(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}
