use phf::phf_map;

/// Keypad symbol to (low group Hz, high group Hz).
static KEYPAD: phf::Map<char, (u32, u32)> = phf_map! {
    '1' => (697, 1209),
    '2' => (697, 1336),
    '3' => (697, 1477),
    'A' => (697, 1633),
    '4' => (770, 1209),
    '5' => (770, 1336),
    '6' => (770, 1477),
    'B' => (770, 1633),
    '7' => (852, 1209),
    '8' => (852, 1336),
    '9' => (852, 1477),
    'C' => (852, 1633),
    '*' => (941, 1209),
    '0' => (941, 1336),
    '#' => (941, 1477),
    'D' => (941, 1633),
};

/// Look up the tone pair for a keypad symbol. Letters are case-insensitive.
pub fn tone_pair(key: char) -> Option<(u32, u32)> {
    KEYPAD.get(&key.to_ascii_uppercase()).copied()
}
