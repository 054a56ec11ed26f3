/// Place `instructions` just before the most recent entry.
///
/// The newest turn keeps the terminal position, which some providers
/// require. Apply the same call to every parallel list (provider payload,
/// canonical thread) so their accounting stays aligned.
pub fn inject_instructions<T>(mut messages: Vec<T>, instructions: Option<T>) -> Vec<T> {
    let Some(instructions) = instructions else {
        return messages;
    };

    match messages.pop() {
        Some(latest) => {
            messages.push(instructions);
            messages.push(latest);
        }
        None => messages.push(instructions),
    }
    messages
}
