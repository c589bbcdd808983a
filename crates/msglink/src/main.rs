#![forbid(unsafe_code)]

fn main() {
    std::process::exit(msglink::run());
}
