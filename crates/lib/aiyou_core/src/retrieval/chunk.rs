//! Newline-based text splitting for ingestion.

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Lines are packed greedily and joined back with `\n`; there is no overlap.
/// A single line longer than `chunk_size` is hard-split on char boundaries.
/// Whitespace-only chunks are dropped.
pub fn split_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > chunk_size {
            flush(&mut chunks, &mut current, &mut current_len);
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(chunk_size) {
                push_chunk(&mut chunks, piece.iter().collect());
            }
            continue;
        }

        let joined_len = if current.is_empty() {
            line_len
        } else {
            current_len + 1 + line_len
        };
        if joined_len > chunk_size {
            flush(&mut chunks, &mut current, &mut current_len);
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    flush(&mut chunks, &mut current, &mut current_len);
    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    push_chunk(chunks, std::mem::take(current));
    *current_len = 0;
}

fn push_chunk(chunks: &mut Vec<String>, chunk: String) {
    if !chunk.trim().is_empty() {
        chunks.push(chunk);
    }
}
