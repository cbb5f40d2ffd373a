#![no_main]

use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_BYTES)];
    if let Ok(dataset) = dg_io::read_csv_reader(data) {
        // Anything that reads must render without panicking.
        if !dataset.rows.is_empty() {
            let grid = dataset.into_grid();
            let _ = grid.render(&mut dg_io::AsciiRenderer::default());
        }
    }
});
