#![no_main]

use deckplay::catalog::Catalog;
use deckplay::input::seek_percentage;
use deckplay::mailbox::Mailbox;
use deckplay::model::{Command, Track};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let len = (data.len() % 32).max(1);
    let tracks = (0..len)
        .map(|idx| Track::new(format!("track_{idx}.wav"), format!("cover_{idx}.jpg")))
        .collect();
    let Some(mut catalog) = Catalog::from_tracks(tracks) else {
        return;
    };
    let mailbox = Mailbox::new();
    let mut last_posted = Command::None;

    for pair in data.chunks(2) {
        let byte = pair[0];
        let arg = pair.get(1).copied().unwrap_or(0);
        match byte % 6 {
            0 => {
                catalog.advance(true);
            }
            1 => {
                catalog.advance(false);
            }
            2 => {
                let command = Command::SeekTo(seek_percentage(u16::from(arg), u16::from(byte)));
                mailbox.post(command);
                last_posted = command;
            }
            3 => {
                mailbox.post(Command::Next);
                last_posted = Command::Next;
            }
            4 => {
                assert_eq!(mailbox.take_if_any(), last_posted);
                last_posted = Command::None;
            }
            _ => {
                let before = catalog.current_index();
                catalog.advance(arg % 2 == 0);
                catalog.advance(arg % 2 != 0);
                assert_eq!(catalog.current_index(), before);
            }
        }
        assert!(catalog.current_index() < catalog.len());
        if let Command::SeekTo(pct) = last_posted {
            assert!(pct <= 100);
        }
    }
});
