use crate::interpreter::pop_string;
use crate::{Vm, VmError};

pub fn str_length(vm: &mut Vm) -> Result<(), VmError> {
    let text = pop_string(vm)?;
    let length = vm.new_integer(text.len() as i32)?;
    vm.mm.push_pointer(length)?;
    Ok(())
}

/// Pop `a`, pop `b`, push `a` followed by `b`.
pub fn str_append(vm: &mut Vm) -> Result<(), VmError> {
    let mut text = pop_string(vm)?;
    text.extend_from_slice(&pop_string(vm)?);
    let at = vm.new_string(&text)?;
    vm.mm.push_pointer(at)?;
    Ok(())
}

/// Pop a String and push an Array of its space-separated parts.
pub fn str_split(vm: &mut Vm) -> Result<(), VmError> {
    let text = pop_string(vm)?;
    let parts = split_words(&text);

    let array = vm.new_array(parts.len() as u32)?;
    let ((), array) = vm.with_rooted(array, |vm| {
        for (i, part) in parts.iter().enumerate() {
            let part = vm.new_string(part)?;
            let array = vm.mm.peek_pointer(0)?;
            vm.mm.view_mut(array)?.set_field(i as u32, part);
        }
        Ok(())
    })?;
    vm.mm.push_pointer(array)?;
    Ok(())
}

/// Split on single spaces. Empty parts are kept except at the end; text
/// without a space is a single part.
fn split_words(text: &[u8]) -> Vec<&[u8]> {
    if !text.contains(&b' ') {
        return vec![text];
    }
    let mut parts: Vec<&[u8]> = text.split(|b| *b == b' ').collect();
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<&str> {
        split_words(text.as_bytes())
            .into_iter()
            .map(|p| std::str::from_utf8(p).unwrap())
            .collect()
    }

    #[test]
    fn split_rules() {
        assert_eq!(split("a bb ccc"), vec!["a", "bb", "ccc"]);
        assert_eq!(split("a  b"), vec!["a", "", "b"]);
        assert_eq!(split(" a"), vec!["", "a"]);
        assert_eq!(split("a b  "), vec!["a", "b"]);
        assert_eq!(split("word"), vec!["word"]);
        assert_eq!(split(""), vec![""]);
        assert!(split("   ").is_empty());
    }
}
