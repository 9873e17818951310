//! Instruction payload sent to the extraction backend.

/// Output shape the backend must follow. Mirrors `CandidateStatement`, so the
/// derived reconciliation fields are not part of it.
pub const OUTPUT_SHAPE: &str = r#"{
  "holderName": "string or null",
  "holderAddress": "string or null",
  "statementDate": "YYYY-MM-DD or null",
  "openingBalance": 0.0,
  "closingBalance": 0.0,
  "transactions": [
    {
      "id": "string",
      "date": "YYYY-MM-DD",
      "description": "string",
      "amount": 0.0,
      "kind": "credit or debit",
      "runningBalance": "number or null"
    }
  ]
}"#;

pub const SYSTEM_PROMPT: &str =
    "You are a precise bank statement analyzer that responds only with a single valid JSON object.";

/// Build the user prompt. `document_text` is embedded verbatim.
pub fn build_prompt(document_text: &str) -> String {
    format!(
        "Analyze the following bank statement text and extract the account holder, \
the statement date, the opening and closing balances, and every transaction.\n\n\
Return exactly one JSON object with this shape:\n\n\
{OUTPUT_SHAPE}\n\n\
Rules:\n\
- Numbers are plain JSON numbers: no currency symbols, no thousands separators.\n\
- \"amount\" is always the positive magnitude. Use \"kind\" for direction: \
\"credit\" increases the balance, \"debit\" decreases it.\n\
- Keep transactions in the order they appear in the statement.\n\
- Use null for anything the statement does not state. Never invent balances.\n\n\
Bank statement text:\n\
{document_text}\n"
    )
}
