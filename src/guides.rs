//! Learning guides shown on the Learn screen.

/// A static learning guide.
#[derive(Debug, Clone, Copy)]
pub struct Guide {
    pub title: &'static str,
    pub summary: &'static str,
    pub sections: &'static [&'static str],
    pub body: &'static str,
}

pub const FUNDAMENTALS_MD: &str = r#"# Prompt Fundamentals

## Basic structure of a prompt

A good prompt has three parts:

- **Instruction**: what the model should do
- **Context**: the information it needs to do it
- **Output format**: what the answer should look like

Example of a basic structure:

    Summarize <article> in [3 bullet points|one paragraph]
    for an audience of <audience>.

## Variables and parameters

Variables (`<name>`) mark the parts of a prompt that change between uses.
Give each one a description so whoever fills it in knows what goes there.

Common parameters:
- Desired response length
- Level of detail
- Tone of communication
- Output format

## Best practices and tips

1. **Be specific and clear**
   - Good: "Write a 200-word product description for a waterproof hiking boot aimed at beginners."
   - Bad: "Write about boots."
2. **Use delimiters** to separate instructions from the material they act on.
3. **Provide examples** of the output you expect.

Additional tips:
- Review and refine your prompts iteratively
- Keep a record of the prompts that work
- Adjust the level of detail based on the results
- Consider the context and limitations of the model
"#;

pub const BEST_PRACTICES_MD: &str = r#"# Best Practices

## Optimizing results

1. **Clear structure**: state the task first, then context, then constraints.
2. **One goal per prompt**: split multi-step work into separate prompts.
3. **Explicit format**: ask for lists, tables or JSON when you will parse the answer.

## Handling errors

1. **Output validation**: ask the model to check its own answer against the requirements.
2. **Fallbacks**: tell the model what to do when information is missing
   ("If the text has no date, answer `unknown`").

## Common patterns

1. **Review pattern**: "Review the following <draft> and list the three most important improvements."
2. **Role pattern**: "You are a <role>. Answer as that role would."

Important reminders:
- Keep a log of successful prompts
- Document failure cases and their fixes
- Update prompts based on the feedback you get
- Share what you learn with the community
"#;

pub const ADVANCED_TECHNIQUES_MD: &str = r#"# Advanced Techniques

## Chain of Thought (CoT)

Ask the model to reason step by step before answering.

CoT example:

    Solve the following problem. Think step by step and show
    your reasoning before giving the final answer: <problem>

## Few-shot learning

Show two or three input/output pairs before the real input. The model
follows the pattern of the examples more reliably than a description.

## Prompt engineering patterns

1. **Expert pattern**: "Act as an expert in <field> with 10 years of experience..."
2. **Step-by-step pattern**: "Break <task> into numbered steps, then complete each one."
3. **Comparative pattern**: "Compare <option a> and <option b> in a table by [cost|speed|quality]."

Advanced considerations:
- Combine several techniques for the best results
- Adapt the patterns to the specific context
- Experiment with different structures
- Balance specificity against flexibility
"#;

pub const USE_CASES_MD: &str = r#"# Use Cases

## Content generation

1. **Article generation**: "Write a <length> article about <topic> for <audience>,
   with an introduction, three sections and a conclusion."
2. **Text analysis**: "Analyze the sentiment of <text> and classify it as
   [positive|neutral|negative]. Justify the classification."
3. **Virtual assistants**: "You are a support assistant for <product>. Answer
   the customer's question politely and in at most three sentences: <question>"

Tips for use cases:
- Adapt prompts to the specific context
- Include relevant examples for each case
- Define goals and limitations clearly
- Consider the needs of the end user
"#;

/// All guides in display order.
pub const GUIDES: &[Guide] = &[
    Guide {
        title: "Prompt Fundamentals",
        summary: "Learn the basics of writing effective prompts",
        sections: &[
            "Basic structure of a prompt",
            "Variables and parameters",
            "Best practices and tips",
        ],
        body: FUNDAMENTALS_MD,
    },
    Guide {
        title: "Advanced Techniques",
        summary: "Master advanced techniques for more powerful prompts",
        sections: &[
            "Chain of Thought",
            "Few-shot Learning",
            "Prompt Engineering Patterns",
        ],
        body: ADVANCED_TECHNIQUES_MD,
    },
    Guide {
        title: "Use Cases",
        summary: "Explore practical examples and real use cases",
        sections: &["Content Generation", "Text Analysis", "Virtual Assistants"],
        body: USE_CASES_MD,
    },
    Guide {
        title: "Best Practices",
        summary: "Learn from the community and its experience",
        sections: &["Optimizing Results", "Handling Errors", "Common Patterns"],
        body: BEST_PRACTICES_MD,
    },
];
