/// Which generation topology a request runs. Picked in strict priority
/// order; first matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Text2Img,
    Img2Img,
    Inpaint,
}
