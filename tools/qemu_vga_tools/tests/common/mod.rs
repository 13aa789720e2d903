#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::thread::{self, JoinHandle};

pub fn text_page(lines: &[&str]) -> Vec<u8> {
    let mut page = vec![0u8; 4000];
    for (row, line) in lines.iter().enumerate() {
        for (col, ch) in line.bytes().enumerate() {
            page[(row * 80 + col) * 2] = ch;
            page[(row * 80 + col) * 2 + 1] = 0x1f;
        }
    }
    page
}

/// Answer one QMP session on `socket`. `pmemsave` writes `memory` unless it is `None`.
pub fn serve_one_session(socket: &Path, memory: Option<Vec<u8>>) -> JoinHandle<Vec<String>> {
    let listener = UnixListener::bind(socket).unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let reader = BufReader::new(stream);
        writer
            .write_all(b"{\"QMP\": {\"version\": {}, \"capabilities\": []}}\r\n")
            .unwrap();

        let mut seen = Vec::new();
        for line in reader.lines() {
            let line = line.unwrap();
            if let Some(rest) = line.split("pmemsave ").nth(1) {
                let path = rest.trim_end_matches("\"}}").rsplit(' ').next().unwrap().to_string();
                if let Some(memory) = &memory {
                    std::fs::write(path, memory).unwrap();
                }
            }
            let quit = line.contains("\"quit\"");
            seen.push(line);
            writer.write_all(b"{\"return\": {}}\r\n").unwrap();
            if quit {
                break;
            }
        }
        seen
    })
}
