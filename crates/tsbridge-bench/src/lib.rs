//! Shared inputs for the tsbridge benchmarks.

/// A TypeScript module of roughly `lines` lines mixing type syntax with
/// plain runtime code. Each repetition of the block declares its own names.
#[must_use]
pub fn synthetic_module(lines: usize) -> String {
    const BLOCK: &[&str] = &[
        "interface Item{n} { id: number; name: string }",
        "type Key{n} = string | number;",
        "export function pick{n}<T, K extends keyof T>(obj: T, key: K): T[K] {",
        "  return obj[key]!;",
        "}",
        "const items{n}: Array<Item{n}> = [];",
        "let total{n}: number = 0;",
        "for (const item of items{n} as Item{n}[]) { total{n} += item.id; }",
        "class Store{n}<T> implements Iterable<T> {",
        "  private data: T[] = [];",
        "  add(value: T): void { this.data.push(value); }",
        "  *[Symbol.iterator](): Iterator<T> { yield* this.data; }",
        "}",
        "const label{n} = `total=${total{n} as number}`;",
    ];
    let blocks = lines.div_ceil(BLOCK.len()).max(1);
    let mut out = String::with_capacity(blocks * BLOCK.len() * 48);
    for n in 0..blocks {
        let n = n.to_string();
        for line in BLOCK {
            out.push_str(&line.replace("{n}", &n));
            out.push('\n');
        }
    }
    out
}
